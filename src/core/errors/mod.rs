//! Error types for the detection pipeline.

mod types;

pub use types::{BoardScanError, BoardScanResult, ImageProcessError, ProcessingStage};
