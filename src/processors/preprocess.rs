//! Classifier input preprocessing.
//!
//! The board classifier expects a square RGB input. Crops are scaled to fit
//! inside the square without distortion, centered on a padded canvas, and
//! converted to an `NCHW` float tensor with values in `[0, 1]`.

use image::{Rgb, RgbImage, imageops};
use ndarray::Array4;

use crate::core::errors::ImageProcessError;

/// Scales `image` to fit a `size`×`size` canvas and centers it on `pad_color`.
pub fn aspect_fit_and_pad(
    image: &RgbImage,
    size: u32,
    pad_color: [u8; 3],
) -> Result<RgbImage, ImageProcessError> {
    if size == 0 {
        return Err(ImageProcessError::InvalidTargetSize(size, size));
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageProcessError::EmptyImage { width, height });
    }

    let ratio = (size as f32 / width as f32).min(size as f32 / height as f32);
    let fitted_width = ((width as f32 * ratio).round() as u32).clamp(1, size);
    let fitted_height = ((height as f32 * ratio).round() as u32).clamp(1, size);

    let resized = if (fitted_width, fitted_height) == (width, height) {
        image.clone()
    } else {
        imageops::resize(
            image,
            fitted_width,
            fitted_height,
            imageops::FilterType::Triangle,
        )
    };

    let mut canvas = RgbImage::from_pixel(size, size, Rgb(pad_color));
    let offset_x = (size - fitted_width) / 2;
    let offset_y = (size - fitted_height) / 2;
    imageops::replace(&mut canvas, &resized, offset_x as i64, offset_y as i64);
    Ok(canvas)
}

/// Converts an RGB image into a `1×3×H×W` tensor scaled to `[0, 1]`.
pub fn to_nchw(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));
    for (x, y, pixel) in image.enumerate_pixels() {
        for (channel, value) in pixel.0.iter().enumerate() {
            tensor[[0, channel, y as usize, x as usize]] = f32::from(*value) / 255.0;
        }
    }
    tensor
}
