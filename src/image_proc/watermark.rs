//! Watermark compositing.
//!
//! The label is built as an SVG overlay the size of the target image and
//! rasterized with system fonts, so the text gets real shaping and a
//! drop-shadow without a hand-rolled glyph pipeline.

use image::{DynamicImage, RgbaImage};
use tracing::trace;

use crate::error::CaptureError;

/// Inset of the label's trailing/bottom edges from the image edges, px.
pub const WATERMARK_MARGIN: u32 = 20;
pub const MIN_FONT_SIZE: u32 = 16;

/// Font size proportional to the image width, floored at the minimum.
pub fn font_size_for_width(width: u32) -> u32 {
    MIN_FONT_SIZE.max(((width as f64) / 40.0).round() as u32)
}

fn overlay_svg(width: u32, height: u32, text: &str, font_size: u32) -> String {
    let text = xml_escape(text);
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}">
  <defs>
    <filter id="shadow" x="-20%" y="-20%" width="140%" height="140%">
      <feDropShadow dx="1" dy="1" stdDeviation="2" flood-opacity="0.5"/>
    </filter>
  </defs>
  <text x="{x}" y="{y}" font-family="Arial, sans-serif" font-size="{font_size}"
        font-weight="bold" fill="rgba(255,255,255,0.8)" text-anchor="end"
        filter="url(#shadow)">{text}</text>
</svg>"#,
        x = width.saturating_sub(WATERMARK_MARGIN),
        y = height.saturating_sub(WATERMARK_MARGIN),
    )
}

/// Composites the watermark label onto the image, anchored at the
/// bottom-right inset.
pub fn apply(img: &mut DynamicImage, text: &str) -> Result<(), CaptureError> {
    let (width, height) = (img.width(), img.height());
    let font_size = font_size_for_width(width);
    let svg = overlay_svg(width, height, text, font_size);
    trace!("Watermark overlay: {}x{}, font {}", width, height, font_size);

    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    let options = usvg::Options {
        fontdb: std::sync::Arc::new(db),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &options)
        .map_err(|e| CaptureError::extraction(format!("watermark svg parse failed: {e}")))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| CaptureError::extraction("failed to allocate watermark pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    // tiny-skia hands back premultiplied alpha; the compositor wants straight
    let mut data = pixmap.take();
    unpremultiply_rgba8_in_place(&mut data);
    let overlay = RgbaImage::from_raw(width, height, data)
        .ok_or_else(|| CaptureError::extraction("watermark pixmap has unexpected size"))?;

    image::imageops::overlay(img, &overlay, 0, 0);
    Ok(())
}

fn unpremultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 || a == 255 {
            continue;
        }
        px[0] = ((px[0] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[1] = ((px[1] as u16 * 255 + a / 2) / a).min(255) as u8;
        px[2] = ((px[2] as u16 * 255 + a / 2) / a).min(255) as u8;
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_size_is_proportional_with_a_floor() {
        assert_eq!(font_size_for_width(400), 16); // 10 floors at 16
        assert_eq!(font_size_for_width(640), 16);
        assert_eq!(font_size_for_width(800), 20);
        assert_eq!(font_size_for_width(2400), 60);
    }

    #[test]
    fn overlay_anchors_at_the_bottom_right_inset() {
        let svg = overlay_svg(2400, 1600, "demo", 60);
        assert!(svg.contains(r#"x="2380""#));
        assert!(svg.contains(r#"y="1580""#));
        assert!(svg.contains(r#"text-anchor="end""#));
        assert!(svg.contains(r#"font-size="60""#));
        assert!(svg.contains("feDropShadow"));
    }

    #[test]
    fn overlay_escapes_markup_in_the_label() {
        let svg = overlay_svg(800, 600, "a<b & \"c\"", 16);
        assert!(svg.contains("a&lt;b &amp; &quot;c&quot;"));
        assert!(!svg.contains("a<b"));
    }

    #[test]
    fn apply_preserves_image_dimensions() {
        let mut img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            320,
            220,
            image::Rgba([10, 10, 10, 255]),
        ));
        apply(&mut img, "watermark").unwrap();
        assert_eq!((img.width(), img.height()), (320, 220));
    }

    #[test]
    fn unpremultiply_restores_straight_alpha() {
        // 50% alpha, premultiplied channel value 64 -> ~128 straight
        let mut px = vec![64u8, 64, 64, 128];
        unpremultiply_rgba8_in_place(&mut px);
        assert!((px[0] as i32 - 128).abs() <= 1);
        assert_eq!(px[3], 128);
    }
}
