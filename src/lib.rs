//! # boardscan
//!
//! Finds chessboard and go-board diagrams on PDF pages.
//!
//! A page is rendered to a small thumbnail, a rectangle detector proposes
//! near-square candidate regions, each candidate is cropped from a larger
//! thumbnail and classified by an ONNX model, and the labelled regions are
//! returned in page coordinates. Results are cached per page for the life of a
//! document session, and concurrent requests for the same page share one
//! detection job.
//!
//! ## Components
//!
//! - **Rectangle detection**: contour based quadrilateral finder ([`models::ContourRectangleDetector`])
//! - **Region classification**: argmax over an ONNX classifier ([`models::OnnxBoardClassifier`])
//! - **Page rendering**: pdfium-backed page source ([`pdf::PdfiumPageSource`])
//! - **Detection session**: single-owner cache and dedup ([`pipeline::DetectionSession`])
//! - **Overlay**: tappable highlight model and raster rendering ([`overlay::AnnotationOverlay`])
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, collaborator traits and ONNX session loading
//! * [`domain`] - Geometry, page identity and annotation types
//! * [`models`] - Concrete detector and classifier implementations
//! * [`pipeline`] - Per-page detection algorithm and the session owner task
//! * [`processors`] - Cropping and classifier preprocessing
//! * [`overlay`] - Presentation of annotations as highlighted boxes
//! * [`utils`] - Logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use boardscan::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(PdfiumPageSource::open("book.pdf")?);
//! let classifier = OnnxBoardClassifier::builder().build("models/chssnet.onnx")?;
//! let detector = PageDetector::new(
//!     Arc::new(ContourRectangleDetector::default()),
//!     Arc::new(classifier),
//!     PipelineConfig::default(),
//! );
//!
//! let session = DetectionSession::spawn(source.clone(), detector);
//! if let Some(page) = source.page(0) {
//!     let annotations = session.annotations(page).await?;
//!     println!("{} boards on the first page", annotations.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod models;
pub mod overlay;
pub mod pdf;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use boardscan::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::config::{
        OrtSessionConfig, ParallelPolicy, PipelineConfig, RectangleDetectionConfig,
        ThumbnailConfig,
    };
    pub use crate::core::traits::{PageSource, RectangleDetector, RegionClassifier};
    pub use crate::core::{BoardScanError, BoardScanResult};
    pub use crate::domain::{
        Annotation, AnnotationKind, Classification, DocumentId, NormalizedRect, PageBox, PageId,
        Point, Rect, RectangleObservation, Size,
    };
    pub use crate::models::{ContourRectangleDetector, OnnxBoardClassifier};
    pub use crate::overlay::{AnnotationOverlay, OverlayStyle};
    pub use crate::pdf::PdfiumPageSource;
    pub use crate::pipeline::{DetectionSession, PageDetector, TimingTable};
}
