//! Rectangle based image cropping.

use image::{RgbImage, imageops};

use crate::core::errors::ImageProcessError;
use crate::domain::Rect;

/// Crops `rect` (top-left origin, pixel units) out of `image`.
///
/// The rectangle is rounded outward to whole pixels and clipped to the image.
/// Fails when nothing of it remains inside the image.
pub fn crop_rect(image: &RgbImage, rect: &Rect) -> Result<RgbImage, ImageProcessError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ImageProcessError::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }
    let values = [rect.x, rect.y, rect.width, rect.height];
    if values.iter().any(|v| !v.is_finite()) || rect.width <= 0.0 || rect.height <= 0.0 {
        return Err(ImageProcessError::InvalidCropCoordinates);
    }

    let bounds = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
    let clipped = rect
        .integral()
        .intersection(&bounds)
        .ok_or(ImageProcessError::CropOutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        })?;

    let x1 = clipped.x as u32;
    let y1 = clipped.y as u32;
    let x2 = (clipped.max_x() as u32).min(image.width());
    let y2 = (clipped.max_y() as u32).min(image.height());
    if x2 <= x1 || y2 <= y1 {
        return Err(ImageProcessError::CropOutOfBounds {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    Ok(imageops::crop_imm(image, x1, y1, x2 - x1, y2 - y1).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0]))
    }

    #[test]
    fn test_crop_inside() {
        let image = gradient(100, 80);
        let crop = crop_rect(&image, &Rect::new(10.0, 20.0, 30.0, 40.0)).unwrap();
        assert_eq!(crop.dimensions(), (30, 40));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([10, 20, 0]));
    }

    #[test]
    fn test_crop_rounds_outward() {
        let image = gradient(100, 80);
        let crop = crop_rect(&image, &Rect::new(10.5, 20.5, 10.0, 10.0)).unwrap();
        assert_eq!(crop.dimensions(), (11, 11));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([10, 20, 0]));
    }

    #[test]
    fn test_crop_clips_partial_overlap() {
        let image = gradient(100, 80);
        let crop = crop_rect(&image, &Rect::new(90.0, -10.0, 30.0, 30.0)).unwrap();
        assert_eq!(crop.dimensions(), (10, 20));
    }

    #[test]
    fn test_crop_outside_fails() {
        let image = gradient(100, 80);
        let err = crop_rect(&image, &Rect::new(200.0, 10.0, 30.0, 30.0)).unwrap_err();
        assert!(matches!(err, ImageProcessError::CropOutOfBounds { .. }));

        let err = crop_rect(&image, &Rect::new(10.0, 10.0, 0.0, 30.0)).unwrap_err();
        assert_eq!(err, ImageProcessError::InvalidCropCoordinates);
    }
}
