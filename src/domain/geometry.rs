//! Geometric primitives shared by the detector, the pipeline and the overlay.
//!
//! Two coordinate conventions meet here. Detectors report boxes normalized
//! to the unit square with the origin at the bottom-left corner of the
//! image; cropping, page coordinates and the overlay use a top-left origin.
//! [`NormalizedRect::to_top_left`] is the single place that converts between
//! them.

use serde::{Deserialize, Serialize};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in pixels or page units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    /// Horizontal extent.
    pub width: f32,
    /// Vertical extent.
    pub height: f32,
}

impl Size {
    /// Creates a new size.
    #[inline]
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size of a raster in pixels.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    /// Multiplies both dimensions by `factor`.
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }

    /// Largest size with this aspect ratio that fits inside `bounds`.
    ///
    /// Returns `None` when either size is empty.
    pub fn fit_within(&self, bounds: Size) -> Option<Size> {
        if self.is_empty() || bounds.is_empty() {
            return None;
        }
        let ratio = (bounds.width / self.width).min(bounds.height / self.height);
        Some(self.scaled(ratio))
    }

    /// Whether either dimension is zero, negative or not finite.
    pub fn is_empty(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle with a top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Rect {
    /// Creates a new rectangle.
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Area of the rectangle; zero for degenerate rectangles.
    pub fn area(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.width * self.height
        }
    }

    /// Whether the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Whether `point` lies inside the rectangle.
    ///
    /// The left and top edges are inclusive, the right and bottom edges exclusive.
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.max_x() && point.y >= self.y && point.y < self.max_y()
    }

    /// Overlapping region of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        (max_x > x && max_y > y).then(|| Rect::new(x, y, max_x - x, max_y - y))
    }

    /// Intersection over union.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection(other).map_or(0.0, |r| r.area());
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }

    /// Smallest rectangle with whole-unit edges that contains this one.
    pub fn integral(&self) -> Rect {
        let x = self.x.floor();
        let y = self.y.floor();
        Rect::new(x, y, self.max_x().ceil() - x, self.max_y().ceil() - y)
    }

    /// Scales origin and size independently along each axis.
    pub fn scaled(&self, sx: f32, sy: f32) -> Rect {
        Rect::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }
}

/// Rectangle normalized to the unit square with a bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    /// Left edge as a fraction of the image width.
    pub x: f32,
    /// Bottom edge as a fraction of the image height, measured from the bottom.
    pub y: f32,
    /// Width as a fraction of the image width.
    pub width: f32,
    /// Height as a fraction of the image height.
    pub height: f32,
}

impl NormalizedRect {
    /// Creates a new normalized rectangle.
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts to a top-left-origin rectangle in a space of the given size.
    ///
    /// `x = bbox.x * W; y = (1 - bbox.y - bbox.height) * H;
    /// w = bbox.width * W; h = bbox.height * H`
    pub fn to_top_left(&self, size: Size) -> Rect {
        Rect::new(
            self.x * size.width,
            (1.0 - self.y - self.height) * size.height,
            self.width * size.width,
            self.height * size.height,
        )
    }

    /// Inverse of [`to_top_left`](Self::to_top_left).
    ///
    /// Returns `None` for an empty space.
    pub fn from_top_left(rect: Rect, size: Size) -> Option<Self> {
        if size.is_empty() {
            return None;
        }
        let width = rect.width / size.width;
        let height = rect.height / size.height;
        Some(Self::new(
            rect.x / size.width,
            1.0 - rect.y / size.height - height,
            width,
            height,
        ))
    }
}
