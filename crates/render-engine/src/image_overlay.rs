//! Still-image overlay compositing.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::DynamicImage;

use crate::CompositeError;

/// JPEG quality of composited stills.
pub const JPEG_QUALITY: u8 = 90;

/// Blend `overlay` over `base` and encode the result as JPEG.
///
/// The canvas takes the base dimensions. The overlay is stretched to exactly
/// those dimensions with bilinear filtering before alpha blending.
pub fn composite_image(base: &[u8], overlay: &[u8]) -> Result<Vec<u8>, CompositeError> {
    let base = image::load_from_memory(base)
        .map_err(|source| CompositeError::Decode { stream: "base", source })?;
    let overlay = image::load_from_memory(overlay)
        .map_err(|source| CompositeError::Decode {
            stream: "overlay",
            source,
        })?;

    let (width, height) = (base.width(), base.height());
    let mut canvas = base.to_rgba8();
    for pixel in canvas.pixels_mut() {
        pixel[3] = u8::MAX;
    }

    let overlay = overlay.to_rgba8();
    let scaled = if overlay.dimensions() == (width, height) {
        overlay
    } else {
        imageops::resize(&overlay, width, height, FilterType::Triangle)
    };
    imageops::overlay(&mut canvas, &scaled, 0, 0);

    let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|source| CompositeError::Encode { source })?;

    tracing::trace!(width, height, bytes = out.len(), "Composited still image");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image.write_to(&mut Cursor::new(&mut buf), format).unwrap();
        buf
    }

    fn red_base(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([220, 20, 20]));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    /// Left half opaque blue, right half fully transparent.
    fn half_blue_overlay(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                Rgba([20, 20, 220, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
    }

    #[test]
    fn test_canvas_takes_base_dimensions() {
        let out = composite_image(&red_base(32, 24), &half_blue_overlay(8, 6)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn test_overlay_is_blended_over_base() {
        let out = composite_image(&red_base(32, 24), &half_blue_overlay(8, 6)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();

        let left = decoded.get_pixel(2, 12);
        assert!(left[2] > 150 && left[0] < 100, "expected blue, got {left:?}");

        let right = decoded.get_pixel(29, 12);
        assert!(right[0] > 150 && right[2] < 100, "expected red, got {right:?}");
    }

    #[test]
    fn test_undecodable_base_is_reported() {
        let err = composite_image(b"not an image", &half_blue_overlay(4, 4)).unwrap_err();
        assert!(err.is_decode());
        assert!(matches!(err, CompositeError::Decode { stream: "base", .. }));
    }

    #[test]
    fn test_undecodable_overlay_is_reported() {
        let err = composite_image(&red_base(4, 4), b"\x89PNG garbage").unwrap_err();
        assert!(matches!(err, CompositeError::Decode { stream: "overlay", .. }));
    }
}
