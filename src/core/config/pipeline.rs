//! Detection pipeline configuration.
//!
//! The defaults reproduce the tuning the board classifier was trained for:
//! a 224 px recognition unit, a 6:9 portrait thumbnail oversized by 2, a
//! second thumbnail at twice that scale for cropping, and near-square
//! rectangle candidates only.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{ConfigError, ConfigValidator};
use crate::domain::{PageBox, RectangleObservation, Size};
use crate::impl_config_validator;

/// Thresholds handed to the rectangle detector.
///
/// The same thresholds are re-applied by the pipeline to whatever the
/// detector returns, so a backend that ignores them cannot leak
/// out-of-range candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectangleDetectionConfig {
    /// Maximum number of candidates kept per page (default: 10)
    pub max_observations: usize,
    /// Minimum candidate size as a fraction of the shorter image side (default: 0.2)
    pub minimum_size: f32,
    /// Minimum short/long side ratio (default: 0.5)
    pub minimum_aspect_ratio: f32,
    /// Maximum short/long side ratio (default: 1.0)
    pub maximum_aspect_ratio: f32,
    /// Minimum detector confidence (default: 0.6)
    pub minimum_confidence: f32,
}

impl Default for RectangleDetectionConfig {
    fn default() -> Self {
        Self {
            max_observations: 10,
            minimum_size: 0.2,
            minimum_aspect_ratio: 0.5,
            maximum_aspect_ratio: 1.0,
            minimum_confidence: 0.6,
        }
    }
}

impl_config_validator!(RectangleDetectionConfig {
    max_observations: min(1),
    minimum_size: range(0.0, 1.0),
    minimum_aspect_ratio: range(0.0, 1.0),
    maximum_aspect_ratio: range(0.0, 1.0),
    minimum_confidence: range(0.0, 1.0),
});

impl RectangleDetectionConfig {
    /// Whether a candidate detected on an image of `image_size` pixels passes
    /// the size, aspect-ratio and confidence thresholds.
    pub fn admits(&self, observation: &RectangleObservation, image_size: Size) -> bool {
        let width = observation.bbox.width * image_size.width;
        let height = observation.bbox.height * image_size.height;
        let image_short = image_size.width.min(image_size.height);
        if !(width > 0.0 && height > 0.0 && image_short > 0.0) {
            return false;
        }

        let short = width.min(height);
        let aspect = short / width.max(height);
        let relative_size = short / image_short;

        observation.confidence >= self.minimum_confidence
            && aspect >= self.minimum_aspect_ratio
            && aspect <= self.maximum_aspect_ratio
            && relative_size >= self.minimum_size
    }

    /// Drops candidates that fail [`admits`](Self::admits) and caps the
    /// result at `max_observations`, keeping detector order.
    pub fn filter(
        &self,
        observations: Vec<RectangleObservation>,
        image_size: Size,
    ) -> Vec<RectangleObservation> {
        observations
            .into_iter()
            .filter(|observation| self.admits(observation, image_size))
            .take(self.max_observations)
            .collect()
    }
}

/// Thumbnail geometry used for detection and cropping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Side of the square recognition unit in pixels (default: 224)
    pub base_input_size: u32,
    /// Height/width ratio of the detection thumbnail as `(height, width)` terms (default: 9:6)
    pub aspect: (u32, u32),
    /// Oversize factor applied to the base unit (default: 2)
    pub oversize_factor: u32,
    /// Linear scale of the crop thumbnail relative to the detection thumbnail (default: 2)
    pub crop_scale: u32,
    /// Page box rendered into thumbnails (default: art box)
    pub thumbnail_box: PageBox,
    /// Page box used for page-space coordinates (default: media box)
    pub bounds_box: PageBox,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            base_input_size: 224,
            aspect: (9, 6),
            oversize_factor: 2,
            crop_scale: 2,
            thumbnail_box: PageBox::ArtBox,
            bounds_box: PageBox::MediaBox,
        }
    }
}

impl_config_validator!(ThumbnailConfig {
    base_input_size: min(1),
    oversize_factor: min(1),
    crop_scale: min(1),
});

impl ThumbnailConfig {
    /// Target size of the thumbnail the rectangle detector runs on.
    pub fn detection_size(&self) -> Size {
        let (aspect_height, aspect_width) = self.aspect;
        let width = self.base_input_size * self.oversize_factor;
        let height = self.base_input_size * aspect_height / aspect_width.max(1) * self.oversize_factor;
        Size::new(width as f32, height as f32)
    }

    /// Target size of the higher-resolution thumbnail regions are cropped from.
    pub fn crop_size(&self) -> Size {
        self.detection_size().scaled(self.crop_scale as f32)
    }
}

/// Preprocessing expected by the board classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Square model input side in pixels (default: 224)
    pub input_size: u32,
    /// Colour used to pad the aspect-fitted crop (default: white)
    pub pad_color: [u8; 3],
    /// Name reported in logs and errors (default: "chssnet")
    pub model_name: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            pad_color: [255, 255, 255],
            model_name: "chssnet".to_string(),
        }
    }
}

impl_config_validator!(ClassifierConfig {
    input_size: min(1),
});

/// Full configuration of the per-page detection pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Rectangle detector thresholds.
    pub detection: RectangleDetectionConfig,
    /// Thumbnail geometry.
    pub thumbnail: ThumbnailConfig,
    /// Classifier preprocessing.
    pub classifier: ClassifierConfig,
}

impl PipelineConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.thumbnail.validate()?;
        self.classifier.validate()?;

        if self.detection.minimum_aspect_ratio > self.detection.maximum_aspect_ratio {
            return Err(ConfigError::InvalidConfig(format!(
                "minimum_aspect_ratio ({}) exceeds maximum_aspect_ratio ({})",
                self.detection.minimum_aspect_ratio, self.detection.maximum_aspect_ratio
            )));
        }
        if self.thumbnail.aspect.0 == 0 || self.thumbnail.aspect.1 == 0 {
            return Err(ConfigError::InvalidConfig(
                "thumbnail aspect terms must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
