//! Raster processing steps between the page thumbnails and the classifier.

pub mod crop;
pub mod preprocess;

pub use crop::crop_rect;
pub use preprocess::{aspect_fit_and_pad, to_nchw};
