//! The core module of the detection pipeline.
//!
//! This module contains the fundamental components shared by every stage:
//! - Configuration management
//! - Error handling
//! - ONNX Runtime session loading
//! - Traits describing the page, detector and classifier collaborators

pub mod config;
pub mod errors;
pub mod inference;
#[macro_use]
pub mod macros;
pub mod traits;

pub use config::{ConfigError, ConfigValidator};
pub use errors::{BoardScanError, BoardScanResult, ImageProcessError, ProcessingStage};
pub use inference::load_session;
pub use traits::{PageSource, RectangleDetector, RegionClassifier};
