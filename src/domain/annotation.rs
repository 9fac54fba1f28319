//! Annotation data model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geometry::{NormalizedRect, Rect};

/// Label assigned to a detected region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Chessboard,
    Goboard,
    Unknown,
}

impl AnnotationKind {
    /// Maps an output class index of the board classifier to a kind.
    pub fn from_class_id(class_id: usize) -> Self {
        match class_id {
            0 => Self::Chessboard,
            1 => Self::Goboard,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chessboard => "chessboard",
            Self::Goboard => "goboard",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified region in page coordinates (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub kind: AnnotationKind,
    pub rect: Rect,
}

impl Annotation {
    pub fn new(kind: AnnotationKind, rect: Rect) -> Self {
        Self { kind, rect }
    }
}

/// Output of classifying a single cropped region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub kind: AnnotationKind,
    /// Raw maximum of the classifier output.
    pub confidence: f32,
}

impl Classification {
    pub fn new(kind: AnnotationKind, confidence: f32) -> Self {
        Self { kind, confidence }
    }

    /// Result used when classification fails.
    pub fn unknown() -> Self {
        Self::new(AnnotationKind::Unknown, 0.0)
    }
}

/// Candidate rectangle proposed by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectangleObservation {
    /// Normalized bounding box with a bottom-left origin.
    pub bbox: NormalizedRect,
    pub confidence: f32,
}

impl RectangleObservation {
    pub fn new(bbox: NormalizedRect, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}
