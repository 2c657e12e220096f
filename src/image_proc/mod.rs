//! Raster post-processing: crop, watermark, encode.
//!
//! Operates on the raw full-page bitmap the renderer captured at
//! device-pixel resolution.

mod watermark;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};
use std::io::Cursor;
use tracing::{debug, warn};

use crate::error::CaptureError;
use crate::renderer::model::{ContentBounds, ImageFormat, PhysicalRect};

pub use watermark::font_size_for_width;

pub struct PostProcessOptions<'a> {
    /// Smart-crop bounds in CSS pixels; None leaves the bitmap uncropped
    pub bounds: Option<ContentBounds>,
    /// Device-scale-factor the bitmap was rendered at
    pub scale: f64,
    pub format: ImageFormat,
    pub quality: u8,
    pub watermark: Option<&'a str>,
}

/// Crops, watermarks and encodes the captured bitmap.
pub fn process(raw_png: &[u8], options: &PostProcessOptions) -> Result<Vec<u8>, CaptureError> {
    let mut img = image::load_from_memory(raw_png)
        .map_err(|e| CaptureError::extraction(format!("failed to decode captured bitmap: {e}")))?;

    if let Some(bounds) = options.bounds {
        let rect = bounds.to_physical(options.scale);
        debug!(
            "Cropping to physical rect: x={}, y={}, w={}, h={}",
            rect.x, rect.y, rect.width, rect.height
        );
        let rect = clip_to_image(rect, img.width(), img.height()).ok_or_else(|| {
            CaptureError::extraction(format!(
                "crop rect {rect:?} lies outside the {}x{} bitmap",
                img.width(),
                img.height()
            ))
        })?;
        img = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    }

    if let Some(text) = options.watermark {
        debug!("Applying watermark: {}", text);
        watermark::apply(&mut img, text)?;
    }

    encode(&img, options.format, options.quality)
}

/// Intersects the crop rect with the bitmap. Bounds padding can push the
/// rect past the document edge; the overhang is trimmed rather than
/// failing the capture. An empty intersection is an extraction failure.
fn clip_to_image(rect: PhysicalRect, width: u32, height: u32) -> Option<PhysicalRect> {
    if rect.x >= width || rect.y >= height || rect.width == 0 || rect.height == 0 {
        return None;
    }
    let clipped = PhysicalRect {
        x: rect.x,
        y: rect.y,
        width: rect.width.min(width - rect.x),
        height: rect.height.min(height - rect.y),
    };
    if clipped != rect {
        warn!("Crop rect {:?} clipped to {:?}", rect, clipped);
    }
    Some(clipped)
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                .map_err(|e| CaptureError::encoding(format!("png encode failed: {e}")))?;
        }
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut Cursor::new(&mut buffer), quality)
                .encode_image(&rgb)
                .map_err(|e| CaptureError::encoding(format!("jpeg encode failed: {e}")))?;
        }
        ImageFormat::Webp => {
            // The webp encoder is lossless; quality only applies to jpeg
            let rgba = img.to_rgba8();
            WebPEncoder::new_lossless(&mut Cursor::new(&mut buffer))
                .write_image(
                    rgba.as_raw(),
                    rgba.width(),
                    rgba.height(),
                    ExtendedColorType::Rgba8,
                )
                .map_err(|e| CaptureError::encoding(format!("webp encode failed: {e}")))?;
        }
    }
    debug!("Encoded {:?} image, {} bytes", format, buffer.len());
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn solid_png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            image::Rgba([40, 90, 200, 255]),
        ));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn decode_dimensions(bytes: &[u8]) -> (u32, u32) {
        let img = image::load_from_memory(bytes).unwrap();
        (img.width(), img.height())
    }

    #[test]
    fn no_bounds_leaves_dimensions_untouched() {
        let raw = solid_png(2400, 1600);
        let options = PostProcessOptions {
            bounds: None,
            scale: 2.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: None,
        };
        let out = process(&raw, &options).unwrap();
        assert_eq!(decode_dimensions(&out), (2400, 1600));
    }

    #[test]
    fn crop_uses_physical_pixels_at_scale_one() {
        // Bounds for a 100x50 box at (40,40) with padding 30
        let bounds = ContentBounds::from_union(40.0, 40.0, 140.0, 90.0, 30.0);
        let raw = solid_png(1200, 800);
        let options = PostProcessOptions {
            bounds: Some(bounds),
            scale: 1.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: None,
        };
        let out = process(&raw, &options).unwrap();
        assert_eq!(decode_dimensions(&out), (160, 110));
    }

    #[test]
    fn crop_multiplies_by_device_scale_factor() {
        let bounds = ContentBounds {
            x: 10.0,
            y: 10.0,
            width: 160.0,
            height: 110.0,
        };
        let raw = solid_png(2400, 1600);
        let options = PostProcessOptions {
            bounds: Some(bounds),
            scale: 2.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: None,
        };
        let out = process(&raw, &options).unwrap();
        assert_eq!(decode_dimensions(&out), (320, 220));
    }

    #[test]
    fn overhanging_crop_is_clipped_to_the_bitmap() {
        let rect = PhysicalRect {
            x: 100,
            y: 100,
            width: 500,
            height: 500,
        };
        let clipped = clip_to_image(rect, 300, 250).unwrap();
        assert_eq!(clipped.width, 200);
        assert_eq!(clipped.height, 150);
    }

    #[test]
    fn crop_fully_outside_the_bitmap_fails() {
        let rect = PhysicalRect {
            x: 400,
            y: 0,
            width: 100,
            height: 100,
        };
        assert!(clip_to_image(rect, 300, 250).is_none());
    }

    #[test]
    fn jpeg_and_webp_encodings_round_trip_dimensions() {
        let raw = solid_png(320, 220);
        for format in [ImageFormat::Jpeg, ImageFormat::Webp] {
            let options = PostProcessOptions {
                bounds: None,
                scale: 1.0,
                format,
                quality: 80,
                watermark: None,
            };
            let out = process(&raw, &options).unwrap();
            assert_eq!(decode_dimensions(&out), (320, 220));
        }
    }
}
