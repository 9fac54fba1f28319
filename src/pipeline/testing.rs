//! Stub collaborators shared by the pipeline tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{Rgb, RgbImage};

use crate::core::config::RectangleDetectionConfig;
use crate::core::errors::{BoardScanError, BoardScanResult};
use crate::core::traits::{PageSource, RectangleDetector, RegionClassifier};
use crate::domain::{
    AnnotationKind, Classification, DocumentId, NormalizedRect, PageBox, PageId,
    RectangleObservation, Size,
};

/// Pages of one fixed size rendered as plain white rasters.
pub struct SolidPageSource {
    id: DocumentId,
    page_count: usize,
    page_size: Size,
    thumbnails: bool,
}

impl SolidPageSource {
    pub fn new(page_count: usize, page_size: Size) -> Self {
        Self {
            id: DocumentId::next(),
            page_count,
            page_size,
            thumbnails: true,
        }
    }

    pub fn without_thumbnails(mut self) -> Self {
        self.thumbnails = false;
        self
    }

    pub fn first_page(&self) -> PageId {
        PageId::new(self.id, 0)
    }
}

impl PageSource for SolidPageSource {
    fn document(&self) -> DocumentId {
        self.id
    }

    fn page_count(&self) -> usize {
        self.page_count
    }

    fn page_bounds(&self, _page: PageId, _page_box: PageBox) -> Option<Size> {
        Some(self.page_size)
    }

    fn render_thumbnail(&self, _page: PageId, target: Size, _page_box: PageBox) -> Option<RgbImage> {
        if !self.thumbnails {
            return None;
        }
        let fitted = self.page_size.fit_within(target)?;
        Some(RgbImage::from_pixel(
            fitted.width.round() as u32,
            fitted.height.round() as u32,
            Rgb([255, 255, 255]),
        ))
    }
}

/// Detector returning a fixed list and counting its invocations.
#[derive(Default)]
pub struct ScriptedDetector {
    observations: Vec<RectangleObservation>,
    fail: bool,
    panic: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    pub fn returning(observations: Vec<RectangleObservation>) -> Self {
        Self {
            observations,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic: true,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RectangleDetector for ScriptedDetector {
    fn detect(
        &self,
        _image: &RgbImage,
        _config: &RectangleDetectionConfig,
    ) -> BoardScanResult<Vec<RectangleObservation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.panic {
            panic!("detector exploded");
        }
        if self.fail {
            return Err(BoardScanError::invalid_input("no detector available"));
        }
        Ok(self.observations.clone())
    }
}

/// Labels crops by width so results do not depend on classification order:
/// under 300 px goboard, under 400 px chessboard, anything wider fails.
#[derive(Default)]
pub struct WidthKeyedClassifier {
    calls: AtomicUsize,
}

impl WidthKeyedClassifier {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RegionClassifier for WidthKeyedClassifier {
    fn classify(&self, image: &RgbImage) -> BoardScanResult<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match image.width() {
            0..300 => Ok(Classification::new(AnnotationKind::Goboard, 0.8)),
            300..400 => Ok(Classification::new(AnnotationKind::Chessboard, 0.9)),
            width => Err(BoardScanError::invalid_input(format!(
                "crop too wide: {width}"
            ))),
        }
    }
}

/// Candidates that the width-keyed classifier labels chessboard, goboard
/// and failure on a 200x300 page.
pub fn three_candidates() -> Vec<RectangleObservation> {
    vec![
        RectangleObservation::new(NormalizedRect::new(0.1, 0.6, 0.4, 0.25), 0.9),
        RectangleObservation::new(NormalizedRect::new(0.5, 0.1, 0.3, 0.2), 0.8),
        RectangleObservation::new(NormalizedRect::new(0.1, 0.1, 0.5, 0.3), 0.7),
    ]
}
