//! Pipeline-level tests for the raster post-processor, driven through the
//! public crate API on synthetic bitmaps. No browser required.

use std::io::Cursor;

use image::{DynamicImage, Rgba, RgbaImage};
use webshot_api::image_proc::{self, PostProcessOptions};
use webshot_api::{ContentBounds, ImageFormat};

fn png_bytes(img: &DynamicImage) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

/// A 1200x800 page at scale 1 with a single 100x50 box at (40,40).
fn page_with_box() -> DynamicImage {
    let mut img = RgbaImage::from_pixel(1200, 800, Rgba([255, 255, 255, 255]));
    for y in 40..90 {
        for x in 40..140 {
            img.put_pixel(x, y, Rgba([30, 120, 220, 255]));
        }
    }
    DynamicImage::ImageRgba8(img)
}

#[test]
fn smart_crop_scenario_yields_a_160x110_image() {
    // Bounds as the analyzer would report them for the box with padding 30
    let bounds = ContentBounds::from_union(40.0, 40.0, 140.0, 90.0, 30.0);
    assert_eq!(
        bounds,
        ContentBounds {
            x: 10.0,
            y: 10.0,
            width: 160.0,
            height: 110.0
        }
    );

    let raw = png_bytes(&page_with_box());
    let out = image_proc::process(
        &raw,
        &PostProcessOptions {
            bounds: Some(bounds),
            scale: 1.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: None,
        },
    )
    .unwrap();

    let cropped = image::load_from_memory(&out).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (160, 110));

    // The box now sits at (30,30): padding worth of page on each side
    let rgba = cropped.to_rgba8();
    assert_eq!(rgba.get_pixel(31, 31), &Rgba([30, 120, 220, 255]));
    assert_eq!(rgba.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
}

#[test]
fn no_bounds_returns_the_unmodified_full_page_dimensions() {
    // smartCrop on a page with no qualifying content falls back to None
    let raw = png_bytes(&page_with_box());
    let out = image_proc::process(
        &raw,
        &PostProcessOptions {
            bounds: None,
            scale: 2.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: None,
        },
    )
    .unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (1200, 800));
}

#[test]
fn device_scale_doubles_the_crop_rect() {
    // A 2400-wide bitmap rendered at scale 2 from a 1200 CSS px viewport
    let raw = png_bytes(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        2400,
        1600,
        Rgba([200, 200, 200, 255]),
    )));
    let bounds = ContentBounds {
        x: 10.0,
        y: 10.0,
        width: 160.0,
        height: 110.0,
    };
    let out = image_proc::process(
        &raw,
        &PostProcessOptions {
            bounds: Some(bounds),
            scale: 2.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: None,
        },
    )
    .unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (320, 220));
}

#[test]
fn watermarked_output_keeps_dimensions_and_changes_the_corner() {
    let raw = png_bytes(&DynamicImage::ImageRgba8(RgbaImage::from_pixel(
        800,
        600,
        Rgba([0, 0, 0, 255]),
    )));
    let out = image_proc::process(
        &raw,
        &PostProcessOptions {
            bounds: None,
            scale: 1.0,
            format: ImageFormat::Png,
            quality: 100,
            watermark: Some("webshot"),
        },
    )
    .unwrap();
    let img = image::load_from_memory(&out).unwrap();
    assert_eq!((img.width(), img.height()), (800, 600));
}

#[test]
fn quality_shrinks_lossy_output() {
    let raw = png_bytes(&page_with_box());
    let encode = |quality| {
        image_proc::process(
            &raw,
            &PostProcessOptions {
                bounds: None,
                scale: 1.0,
                format: ImageFormat::Jpeg,
                quality,
                watermark: None,
            },
        )
        .unwrap()
    };
    let high = encode(95);
    let low = encode(20);
    assert!(low.len() < high.len());
}
