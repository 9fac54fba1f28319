//! Contour based rectangle detector.
//!
//! Finds quadrilateral outlines in a page thumbnail: the thumbnail is
//! blurred, run through Canny edge detection, traced into contours and each
//! contour is simplified with Douglas-Peucker. Convex four-sided polygons
//! become candidates whose confidence is their rectangularity (polygon area
//! over bounding-box area).

use image::{GrayImage, RgbImage, imageops};
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point as PixelPoint;
use itertools::Itertools;
use tracing::debug;

use crate::core::config::RectangleDetectionConfig;
use crate::core::errors::{BoardScanError, BoardScanResult, ImageProcessError};
use crate::core::traits::RectangleDetector;
use crate::domain::{NormalizedRect, Rect, RectangleObservation, Size};

/// Tuning of the edge and polygon stages.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourDetectorParams {
    /// Standard deviation of the pre-blur.
    pub blur_sigma: f32,
    /// Lower hysteresis threshold for Canny.
    pub canny_low: f32,
    /// Upper hysteresis threshold for Canny.
    pub canny_high: f32,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter.
    pub approximation_factor: f64,
    /// Candidates overlapping an accepted one at least this much are dropped.
    pub duplicate_iou: f32,
}

impl Default for ContourDetectorParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.1,
            canny_low: 75.0,
            canny_high: 200.0,
            approximation_factor: 0.02,
            duplicate_iou: 0.8,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContourRectangleDetector {
    params: ContourDetectorParams,
}

impl ContourRectangleDetector {
    pub fn new(params: ContourDetectorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ContourDetectorParams {
        &self.params
    }

    fn edge_map(&self, image: &RgbImage) -> GrayImage {
        let gray = imageops::grayscale(image);
        let blurred = gaussian_blur_f32(&gray, self.params.blur_sigma);
        canny(&blurred, self.params.canny_low, self.params.canny_high)
    }

    /// Pixel-space quadrilateral candidates with their rectangularity.
    fn quadrilaterals(&self, edges: &GrayImage) -> Vec<(Rect, f32)> {
        find_contours::<i32>(edges)
            .into_iter()
            .filter(|contour| contour.points.len() >= 8)
            .filter_map(|contour| {
                let perimeter = arc_length(&contour.points, true);
                let epsilon = self.params.approximation_factor * perimeter;
                if epsilon <= 0.0 {
                    return None;
                }
                let polygon = approximate_polygon_dp(&contour.points, epsilon, true);
                let corners = distinct_vertices(&polygon, epsilon.max(2.0));
                (corners.len() == 4 && is_convex(&corners)).then(|| bounding_quad(&corners))
            })
            .collect()
    }
}

impl RectangleDetector for ContourRectangleDetector {
    fn detect(
        &self,
        image: &RgbImage,
        config: &RectangleDetectionConfig,
    ) -> BoardScanResult<Vec<RectangleObservation>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(BoardScanError::from(ImageProcessError::EmptyImage {
                width,
                height,
            }));
        }
        let image_size = Size::from_pixels(width, height);

        let edges = self.edge_map(image);
        let candidates = self
            .quadrilaterals(&edges)
            .into_iter()
            .filter_map(|(rect, confidence)| {
                NormalizedRect::from_top_left(rect, image_size)
                    .map(|bbox| (rect, RectangleObservation::new(bbox, confidence)))
            })
            .filter(|(_, observation)| config.admits(observation, image_size))
            .sorted_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence))
            .collect::<Vec<_>>();

        let mut accepted: Vec<(Rect, RectangleObservation)> = Vec::new();
        for (rect, observation) in candidates {
            if accepted.len() >= config.max_observations {
                break;
            }
            let duplicate = accepted
                .iter()
                .any(|(kept, _)| kept.iou(&rect) >= self.params.duplicate_iou);
            if !duplicate {
                accepted.push((rect, observation));
            }
        }

        debug!(
            "contour detector kept {} rectangles on {}x{}",
            accepted.len(),
            width,
            height
        );
        Ok(accepted.into_iter().map(|(_, observation)| observation).collect())
    }
}

fn distance(a: PixelPoint<i32>, b: PixelPoint<i32>) -> f64 {
    let dx = f64::from(a.x - b.x);
    let dy = f64::from(a.y - b.y);
    (dx * dx + dy * dy).sqrt()
}

/// Drops vertices closer than `tolerance` to their predecessor, including
/// the closing vertex that repeats the start of a closed polygon.
fn distinct_vertices(polygon: &[PixelPoint<i32>], tolerance: f64) -> Vec<PixelPoint<i32>> {
    let mut vertices: Vec<PixelPoint<i32>> = Vec::with_capacity(polygon.len());
    for &point in polygon {
        if vertices.last().is_none_or(|&last| distance(last, point) >= tolerance) {
            vertices.push(point);
        }
    }
    while vertices.len() > 1 {
        match (vertices.first(), vertices.last()) {
            (Some(&first), Some(&last)) if distance(first, last) < tolerance => {
                vertices.pop();
            }
            _ => break,
        }
    }
    vertices
}

fn cross(o: PixelPoint<i32>, a: PixelPoint<i32>, b: PixelPoint<i32>) -> i64 {
    i64::from(a.x - o.x) * i64::from(b.y - o.y) - i64::from(a.y - o.y) * i64::from(b.x - o.x)
}

fn is_convex(corners: &[PixelPoint<i32>]) -> bool {
    let n = corners.len();
    let turns: Vec<i64> = (0..n)
        .map(|i| cross(corners[i], corners[(i + 1) % n], corners[(i + 2) % n]))
        .collect();
    turns.iter().all(|&t| t > 0) || turns.iter().all(|&t| t < 0)
}

/// Bounding box of the polygon and the share of it the polygon covers.
fn bounding_quad(corners: &[PixelPoint<i32>]) -> (Rect, f32) {
    let (min_x, max_x) = corners
        .iter()
        .map(|p| p.x)
        .minmax()
        .into_option()
        .unwrap_or((0, 0));
    let (min_y, max_y) = corners
        .iter()
        .map(|p| p.y)
        .minmax()
        .into_option()
        .unwrap_or((0, 0));

    let n = corners.len();
    let twice_area: i64 = (0..n)
        .map(|i| {
            let (a, b) = (corners[i], corners[(i + 1) % n]);
            i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y)
        })
        .sum();
    let polygon_area = twice_area.abs() as f32 / 2.0;

    let width = (max_x - min_x) as f32;
    let height = (max_y - min_y) as f32;
    let box_area = width * height;
    let rectangularity = if box_area > 0.0 {
        (polygon_area / box_area).min(1.0)
    } else {
        0.0
    };
    // Contour pixels are inclusive on both ends.
    let rect = Rect::new(min_x as f32, min_y as f32, width + 1.0, height + 1.0);
    (rect, rectangularity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
    use imageproc::rect::Rect as DrawRect;

    fn page() -> RgbImage {
        RgbImage::from_pixel(448, 672, Rgb([255, 255, 255]))
    }

    fn detect(image: &RgbImage) -> Vec<RectangleObservation> {
        ContourRectangleDetector::default()
            .detect(image, &RectangleDetectionConfig::default())
            .unwrap()
    }

    #[test]
    fn test_blank_page_has_no_candidates() {
        assert!(detect(&page()).is_empty());
    }

    #[test]
    fn test_finds_square_diagram() {
        let mut image = page();
        draw_filled_rect_mut(
            &mut image,
            DrawRect::at(100, 200).of_size(200, 200),
            Rgb([30, 30, 30]),
        );

        let observations = detect(&image);
        assert_eq!(observations.len(), 1, "{observations:?}");

        let rect = observations[0].bbox.to_top_left(Size::new(448.0, 672.0));
        assert!((rect.x - 100.0).abs() <= 4.0, "{rect:?}");
        assert!((rect.y - 200.0).abs() <= 4.0, "{rect:?}");
        assert!((rect.width - 200.0).abs() <= 6.0, "{rect:?}");
        assert!((rect.height - 200.0).abs() <= 6.0, "{rect:?}");
        assert!(observations[0].confidence > 0.9);
    }

    #[test]
    fn test_rejects_elongated_and_small_rectangles() {
        let mut image = page();
        draw_filled_rect_mut(
            &mut image,
            DrawRect::at(20, 40).of_size(400, 100),
            Rgb([0, 0, 0]),
        );
        draw_filled_rect_mut(
            &mut image,
            DrawRect::at(200, 400).of_size(40, 40),
            Rgb([0, 0, 0]),
        );
        assert!(detect(&image).is_empty());
    }

    #[test]
    fn test_ignores_triangles() {
        let mut image = page();
        draw_polygon_mut(
            &mut image,
            &[
                PixelPoint::new(100, 500),
                PixelPoint::new(350, 500),
                PixelPoint::new(220, 250),
            ],
            Rgb([0, 0, 0]),
        );
        assert!(detect(&image).is_empty());
    }

    #[test]
    fn test_respects_max_observations() {
        let mut image = page();
        for (x, y) in [(20, 20), (240, 20), (20, 340), (240, 340)] {
            draw_filled_rect_mut(
                &mut image,
                DrawRect::at(x, y).of_size(180, 180),
                Rgb([0, 0, 0]),
            );
        }
        let config = RectangleDetectionConfig {
            max_observations: 2,
            ..Default::default()
        };
        let observations = ContourRectangleDetector::default()
            .detect(&image, &config)
            .unwrap();
        assert_eq!(observations.len(), 2);
    }

    #[test]
    fn test_distinct_vertices_drops_closing_point() {
        let polygon = [
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(10, 10),
            PixelPoint::new(0, 10),
            PixelPoint::new(0, 1),
            PixelPoint::new(0, 0),
        ];
        let vertices = distinct_vertices(&polygon, 2.0);
        assert_eq!(vertices.len(), 4);
        assert!(is_convex(&vertices));
        let (rect, rectangularity) = bounding_quad(&vertices);
        assert_eq!(rect, Rect::new(0.0, 0.0, 11.0, 11.0));
        assert_eq!(rectangularity, 1.0);
    }

    #[test]
    fn test_concave_quad_is_not_convex() {
        let quad = [
            PixelPoint::new(0, 0),
            PixelPoint::new(10, 0),
            PixelPoint::new(3, 3),
            PixelPoint::new(0, 10),
        ];
        assert!(!is_convex(&quad));
    }
}
