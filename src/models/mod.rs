//! Concrete rectangle detector and region classifier.

pub mod board_classifier;
pub mod rectangle_detector;

pub use board_classifier::{OnnxBoardClassifier, OnnxBoardClassifierBuilder, argmax};
pub use rectangle_detector::{ContourDetectorParams, ContourRectangleDetector};
