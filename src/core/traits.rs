//! Interfaces of the collaborators the detection pipeline depends on.
//!
//! The pipeline only talks to pages, detectors and classifiers through these
//! traits, so rendering backends and models can be swapped (or stubbed in
//! tests) without touching the orchestration code.

use image::RgbImage;

use crate::core::config::RectangleDetectionConfig;
use crate::core::errors::BoardScanResult;
use crate::domain::{Classification, DocumentId, PageBox, PageId, RectangleObservation, Size};

/// A document whose pages can be enumerated, measured and rendered.
pub trait PageSource: Send + Sync {
    /// Identity of the open document.
    fn document(&self) -> DocumentId;

    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Handle of the page at `index`, if it exists.
    fn page(&self, index: usize) -> Option<PageId> {
        (index < self.page_count()).then(|| PageId::new(self.document(), index))
    }

    /// Every page handle in document order.
    fn pages(&self) -> Vec<PageId> {
        (0..self.page_count())
            .map(|index| PageId::new(self.document(), index))
            .collect()
    }

    /// Size of `page` in page units for the given box.
    fn page_bounds(&self, page: PageId, page_box: PageBox) -> Option<Size>;

    /// Renders `page` so that it fits inside `target`, preserving aspect ratio.
    ///
    /// Returns `None` when no thumbnail can be produced.
    fn render_thumbnail(&self, page: PageId, target: Size, page_box: PageBox) -> Option<RgbImage>;
}

/// Proposes rectangular regions of interest in a raster image.
pub trait RectangleDetector: Send + Sync {
    /// Returns candidate rectangles with normalized, bottom-left-origin boxes.
    fn detect(
        &self,
        image: &RgbImage,
        config: &RectangleDetectionConfig,
    ) -> BoardScanResult<Vec<RectangleObservation>>;
}

/// Assigns a board label to a cropped region.
pub trait RegionClassifier: Send + Sync {
    /// Classifies one cropped region.
    fn classify(&self, image: &RgbImage) -> BoardScanResult<Classification>;
}
