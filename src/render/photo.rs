//! # Photo Preparation
//!
//! Fits an arbitrary photo to the print head before dithering, and turns a
//! dithered bitmap back into an image for on-screen preview.
//!
//! Photos are scaled so their width matches the head exactly; height follows
//! the aspect ratio. Nothing is cropped.

use image::{DynamicImage, GrayImage, imageops::FilterType};

use super::dither::Bitmap;
use crate::error::MiniPrintError;

/// Scale `image` to `width` dots wide and reduce it to gray.
///
/// Height is `floor(h * width / w)`, never less than one row.
///
/// ## Errors
///
/// Returns [`MiniPrintError::Image`] if `width` is zero or the image is empty.
pub fn fit_to_width(image: &DynamicImage, width: u32) -> Result<Bitmap, MiniPrintError> {
    if width == 0 {
        return Err(MiniPrintError::Image("target width must be > 0".to_string()));
    }
    let (src_w, src_h) = (image.width(), image.height());
    if src_w == 0 || src_h == 0 {
        return Err(MiniPrintError::Image("image has no pixels".to_string()));
    }

    let height = ((src_h as u64 * width as u64) / src_w as u64).max(1) as u32;
    if (src_w, src_h) == (width, height) {
        return Ok(Bitmap::from_image(image));
    }
    let resized = image.resize_exact(width, height, FilterType::Lanczos3);
    Ok(Bitmap::from_image(&resized))
}

/// Load a photo from disk and fit it to `width`.
pub fn load_fitted(path: &std::path::Path, width: u32) -> Result<Bitmap, MiniPrintError> {
    let image = image::open(path)?;
    fit_to_width(&image, width)
}

/// Convert a bitmap into a gray image (for saving previews).
pub fn to_preview(bitmap: &Bitmap) -> Result<GrayImage, MiniPrintError> {
    GrayImage::from_raw(
        bitmap.width() as u32,
        bitmap.height() as u32,
        bitmap.pixels().to_vec(),
    )
    .ok_or_else(|| MiniPrintError::Image("bitmap buffer size mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_fit_scales_to_head_width() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(768, 1000, Rgb([200, 10, 10])));
        let bmp = fit_to_width(&img, 384).unwrap();
        assert_eq!(bmp.width(), 384);
        assert_eq!(bmp.height(), 500);
    }

    #[test]
    fn test_fit_floors_height() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(1000, 333));
        let bmp = fit_to_width(&img, 384).unwrap();
        // 333 * 384 / 1000 = 127.872
        assert_eq!(bmp.height(), 127);
    }

    #[test]
    fn test_fit_keeps_exact_size() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(384, 10, image::Luma([42])));
        let bmp = fit_to_width(&img, 384).unwrap();
        assert_eq!(bmp.height(), 10);
        assert!(bmp.pixels().iter().all(|&p| p == 42));
    }

    #[test]
    fn test_fit_rejects_zero_width() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
        assert!(fit_to_width(&img, 0).is_err());
    }

    #[test]
    fn test_preview_roundtrip_dimensions() {
        let bmp = Bitmap::filled(16, 3, 255).unwrap();
        let preview = to_preview(&bmp).unwrap();
        assert_eq!(preview.dimensions(), (16, 3));
    }
}
