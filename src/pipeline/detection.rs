//! Per-page detection algorithm.
//!
//! 1. Render a detection thumbnail of the page.
//! 2. Propose rectangles on it and keep the ones passing the thresholds.
//! 3. Render a larger thumbnail and crop every candidate out of it.
//! 4. Classify the crops in parallel.
//! 5. Map every candidate to page coordinates and pair it with its label.
//!
//! Every failure short of a panic degrades instead of propagating: a missing
//! thumbnail or a detector error yields no annotations, a failed crop drops
//! that candidate and a failed classification labels it unknown.

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::config::PipelineConfig;
use crate::core::traits::{PageSource, RectangleDetector, RegionClassifier};
use crate::domain::{Annotation, Classification, PageId, RectangleObservation, Size};
use crate::processors::crop_rect;

/// Runs detection and classification for single pages.
pub struct PageDetector {
    detector: Arc<dyn RectangleDetector>,
    classifier: Arc<dyn RegionClassifier>,
    config: PipelineConfig,
}

impl std::fmt::Debug for PageDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageDetector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PageDetector {
    pub fn new(
        detector: Arc<dyn RectangleDetector>,
        classifier: Arc<dyn RegionClassifier>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            detector,
            classifier,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Detects and classifies the boards on `page`.
    ///
    /// Annotations follow the detector's candidate order.
    pub fn detect_page(&self, source: &dyn PageSource, page: PageId) -> Vec<Annotation> {
        let thumbnail = &self.config.thumbnail;

        let Some(detection_image) =
            source.render_thumbnail(page, thumbnail.detection_size(), thumbnail.thumbnail_box)
        else {
            debug!("{}: no detection thumbnail", page);
            return Vec::new();
        };
        let detection_size =
            Size::from_pixels(detection_image.width(), detection_image.height());

        let observations = match self.detector.detect(&detection_image, &self.config.detection) {
            Ok(observations) => self.config.detection.filter(observations, detection_size),
            Err(e) => {
                warn!("{}: rectangle detection failed: {}", page, e);
                return Vec::new();
            }
        };
        if observations.is_empty() {
            return Vec::new();
        }

        let Some(page_size) = source.page_bounds(page, thumbnail.bounds_box) else {
            warn!("{}: page bounds unavailable", page);
            return Vec::new();
        };
        let Some(crop_image) =
            source.render_thumbnail(page, thumbnail.crop_size(), thumbnail.thumbnail_box)
        else {
            warn!("{}: no crop thumbnail", page);
            return Vec::new();
        };
        let crop_size = Size::from_pixels(crop_image.width(), crop_image.height());

        let regions: Vec<(RectangleObservation, image::RgbImage)> = observations
            .into_iter()
            .filter_map(|observation| {
                let rect = observation.bbox.to_top_left(crop_size);
                match crop_rect(&crop_image, &rect) {
                    Ok(region) => Some((observation, region)),
                    Err(e) => {
                        debug!("{}: skipping candidate {:?}: {}", page, rect, e);
                        None
                    }
                }
            })
            .collect();

        let classifications: Vec<Classification> = regions
            .par_iter()
            .map(|(_, region)| {
                self.classifier.classify(region).unwrap_or_else(|e| {
                    warn!("{}: classification failed: {}", page, e);
                    Classification::unknown()
                })
            })
            .collect();

        regions
            .iter()
            .zip(classifications)
            .map(|((observation, _), classification)| {
                Annotation::new(classification.kind, observation.bbox.to_top_left(page_size))
            })
            .collect()
    }
}
