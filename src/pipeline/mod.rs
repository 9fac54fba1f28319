//! Per-page detection pipeline and the session that caches its results.

mod cache;
mod detection;
mod session;
mod timing;

#[cfg(test)]
mod testing;

pub use cache::AnnotationCache;
pub use detection::PageDetector;
pub use session::DetectionSession;
pub use timing::{TimingSummary, TimingTable};
