//! Configuration management for the detection pipeline.
//!
//! This module provides configuration types, validation traits, and utilities
//! for tuning rectangle detection, thumbnail rendering, classification and
//! ONNX Runtime sessions.

pub mod errors;
pub mod onnx;
pub mod parallel;
pub mod pipeline;

pub use errors::{ConfigError, ConfigValidator, validate_min, validate_range};
pub use onnx::*;
pub use parallel::ParallelPolicy;
pub use pipeline::{ClassifierConfig, PipelineConfig, RectangleDetectionConfig, ThumbnailConfig};
