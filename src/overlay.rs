//! Presentation of annotations as tappable highlight boxes.
//!
//! [`AnnotationOverlay`] is the headless view model of the boxes drawn over
//! a displayed page: one region per annotation, coloured by kind, with an
//! independent selection flag that thickens its border. Taps are routed to
//! the first region containing the point; taps outside every region fall
//! through to the page. [`AnnotationOverlay::render_onto`] draws the current
//! state into a page raster.

use image::{Rgb, RgbImage};

use crate::domain::{Annotation, AnnotationKind, Point, Rect};

/// Colours and border widths of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    pub chessboard: [u8; 3],
    pub goboard: [u8; 3],
    pub unknown: [u8; 3],
    /// Opacity of the border colour.
    pub alpha: f32,
    pub border_width: f32,
    pub selected_border_width: f32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            chessboard: [255, 59, 48],
            goboard: [0, 199, 190],
            unknown: [255, 255, 0],
            alpha: 0.8,
            border_width: 1.0,
            selected_border_width: 5.0,
        }
    }
}

impl OverlayStyle {
    pub fn color(&self, kind: AnnotationKind) -> [u8; 3] {
        match kind {
            AnnotationKind::Chessboard => self.chessboard,
            AnnotationKind::Goboard => self.goboard,
            AnnotationKind::Unknown => self.unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayRegion {
    pub kind: AnnotationKind,
    /// Annotation rectangle rounded outward to whole page units.
    pub frame: Rect,
    pub selected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationOverlay {
    regions: Vec<OverlayRegion>,
    style: OverlayStyle,
}

impl AnnotationOverlay {
    pub fn new(annotations: &[Annotation], style: OverlayStyle) -> Self {
        let mut overlay = Self {
            regions: Vec::new(),
            style,
        };
        overlay.set_annotations(annotations);
        overlay
    }

    /// Replaces every region, clearing selection.
    pub fn set_annotations(&mut self, annotations: &[Annotation]) {
        self.regions = annotations
            .iter()
            .map(|annotation| OverlayRegion {
                kind: annotation.kind,
                frame: annotation.rect.integral(),
                selected: false,
            })
            .collect();
    }

    pub fn regions(&self) -> &[OverlayRegion] {
        &self.regions
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// The overlay is not shown when there is nothing to highlight.
    pub fn is_hidden(&self) -> bool {
        self.regions.is_empty()
    }

    /// Index of the region receiving a tap at `point`.
    pub fn hit_test(&self, point: Point) -> Option<usize> {
        self.regions
            .iter()
            .position(|region| region.frame.contains(point))
    }

    /// Toggles the selection of the region under `point`.
    ///
    /// Returns `false` when the tap hit no region.
    pub fn tap(&mut self, point: Point) -> bool {
        match self.hit_test(point) {
            Some(index) => {
                let region = &mut self.regions[index];
                region.selected = !region.selected;
                true
            }
            None => false,
        }
    }

    /// Border width of region `index` in its current state.
    pub fn border_width(&self, index: usize) -> Option<f32> {
        self.regions.get(index).map(|region| {
            if region.selected {
                self.style.selected_border_width
            } else {
                self.style.border_width
            }
        })
    }

    /// Blends every region border into `image`.
    ///
    /// `scale` converts page units to pixels of `image`. Borders are drawn
    /// inside their frames.
    pub fn render_onto(&self, image: &mut RgbImage, scale: f32) {
        let (width, height) = image.dimensions();
        for (index, region) in self.regions.iter().enumerate() {
            let frame = region.frame.scaled(scale, scale).integral();
            let border = self
                .border_width(index)
                .map_or(1, |w| (w * scale).round().max(1.0) as i64);
            let color = self.style.color(region.kind);

            let x0 = (frame.x as i64).max(0);
            let y0 = (frame.y as i64).max(0);
            let x1 = (frame.max_x() as i64).min(i64::from(width));
            let y1 = (frame.max_y() as i64).min(i64::from(height));
            for y in y0..y1 {
                for x in x0..x1 {
                    let inside = x - frame.x as i64 >= border
                        && frame.max_x() as i64 - 1 - x >= border
                        && y - frame.y as i64 >= border
                        && frame.max_y() as i64 - 1 - y >= border;
                    if !inside {
                        let pixel = image.get_pixel_mut(x as u32, y as u32);
                        *pixel = blend(*pixel, color, self.style.alpha);
                    }
                }
            }
        }
    }
}

fn blend(base: Rgb<u8>, color: [u8; 3], alpha: f32) -> Rgb<u8> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mix = |b: u8, c: u8| (f32::from(c) * alpha + f32::from(b) * (1.0 - alpha)).round() as u8;
    Rgb([
        mix(base[0], color[0]),
        mix(base[1], color[1]),
        mix(base[2], color[2]),
    ])
}
