//! Domain types: geometry, page identity and annotations.

mod annotation;
mod geometry;
mod page;

pub use annotation::{Annotation, AnnotationKind, Classification, RectangleObservation};
pub use geometry::{NormalizedRect, Point, Rect, Size};
pub use page::{DocumentId, PageBox, PageId};
