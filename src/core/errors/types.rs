//! Core error types for the detection pipeline.
//!
//! This module defines the error types shared by every pipeline component:
//! the main [`BoardScanError`] enum, the [`ProcessingStage`] used to tag
//! where a failure happened, and [`ImageProcessError`] for raster operations.

use thiserror::Error;

/// Errors that can occur during image processing operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ImageProcessError {
    /// The image has a zero dimension.
    #[error("Image is empty ({width}x{height})")]
    EmptyImage {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
    },
    /// The crop region does not intersect the image.
    #[error("Crop region ({x}, {y}, {width}x{height}) lies outside the image")]
    CropOutOfBounds {
        /// Left edge of the requested region.
        x: f32,
        /// Top edge of the requested region.
        y: f32,
        /// Requested width.
        width: f32,
        /// Requested height.
        height: f32,
    },
    /// The crop rectangle is degenerate or not finite.
    #[error("Invalid crop coordinates")]
    InvalidCropCoordinates,
    /// The requested target size is invalid (e.g., zero dimensions).
    #[error("Invalid target size ({0}x{1})")]
    InvalidTargetSize(u32, u32),
}

/// Stage of the detection pipeline an error is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Rendering a page thumbnail.
    Rendering,
    /// Running the rectangle detector.
    RectangleDetection,
    /// Cropping a candidate region.
    Cropping,
    /// Preparing a crop for the classifier.
    Preprocessing,
    /// Running the region classifier.
    Classification,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Rendering => write!(f, "rendering"),
            ProcessingStage::RectangleDetection => write!(f, "rectangle detection"),
            ProcessingStage::Cropping => write!(f, "cropping"),
            ProcessingStage::Preprocessing => write!(f, "preprocessing"),
            ProcessingStage::Classification => write!(f, "classification"),
        }
    }
}

/// Errors produced by the detection pipeline and its collaborators.
#[derive(Error, Debug)]
pub enum BoardScanError {
    /// Error occurred while decoding or encoding an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during a processing stage.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred during model inference.
    #[error("inference failed in model '{model_name}': {context}")]
    Inference {
        /// The model that failed.
        model_name: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// A page could not be rendered.
    #[error("failed to render page {page}: {message}")]
    Render {
        /// 0-based page index.
        page: usize,
        /// Renderer message.
        message: String,
    },

    /// The session owner task is no longer running.
    #[error("detection session closed")]
    SessionClosed,

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),

    /// Error loading a model file.
    #[error("model load failed for '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path to the model that failed to load.
        model_path: String,
        /// Short reason string.
        reason: String,
        /// Optional suggestion (prefixed with '; ' when present).
        suggestion: String,
        /// Underlying source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result alias used across the crate.
pub type BoardScanResult<T> = Result<T, BoardScanError>;

impl From<image::ImageError> for BoardScanError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for BoardScanError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

impl From<ImageProcessError> for BoardScanError {
    fn from(error: ImageProcessError) -> Self {
        let kind = match error {
            ImageProcessError::CropOutOfBounds { .. } | ImageProcessError::InvalidCropCoordinates => {
                ProcessingStage::Cropping
            }
            ImageProcessError::EmptyImage { .. } | ImageProcessError::InvalidTargetSize(..) => {
                ProcessingStage::Preprocessing
            }
        };
        Self::Processing {
            kind,
            context: "Image processing failed".to_string(),
            source: Box::new(error),
        }
    }
}

impl BoardScanError {
    /// Wraps an error raised while running a detector or classifier adapter.
    pub fn adapter_execution_error(
        adapter: impl Into<String>,
        stage: ProcessingStage,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind: stage,
            context: adapter.into(),
            source: Box::new(source),
        }
    }

    /// Creates an inference error for the named model.
    pub fn inference_error(
        model_name: impl Into<String>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a model load error with a recovery hint.
    pub fn model_load_error(
        model_path: impl Into<String>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::ModelLoad {
            model_path: model_path.into(),
            reason: reason.into(),
            suggestion: suggestion.map(|s| format!("; {s}")).unwrap_or_default(),
            source,
        }
    }
}
