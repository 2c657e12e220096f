//! End-to-end capture tests driving a real browser.
//!
//! These need a `chromedriver` binary on PATH (or a running WebDriver on
//! localhost:4444) and are ignored by default:
//!
//!     cargo test -- --ignored

use webshot_api::{CaptureRequest, ImageFormat, InputSource, Renderer};

fn static_page() -> String {
    r#"<!doctype html>
<html>
  <head><style>body { margin: 0; background: #fff; }</style></head>
  <body>
    <div style="position:absolute; left:40px; top:40px; width:100px; height:50px; background:#1e78dc;"></div>
  </body>
</html>"#
        .to_string()
}

#[tokio::test]
#[ignore = "requires chromedriver"]
async fn full_page_width_is_viewport_times_scale() {
    let renderer = Renderer::new(None);
    let mut request = CaptureRequest::new(InputSource::InlineMarkup(static_page()));
    request.viewport_width = 1200;
    request.scale = 2.0;
    request.full_page = true;
    request.smart_crop = false;

    let buffer = renderer.capture(&request).await.unwrap();
    let img = image::load_from_memory(&buffer).unwrap();
    assert_eq!(img.width(), 2400);

    renderer.close().await;
}

#[tokio::test]
#[ignore = "requires chromedriver"]
async fn smart_crop_tightens_to_the_styled_box() {
    let renderer = Renderer::new(None);
    let mut request = CaptureRequest::new(InputSource::InlineMarkup(static_page()));
    request.viewport_width = 1200;
    request.scale = 1.0;
    request.smart_crop = true;
    request.smart_crop_padding = 30;

    let buffer = renderer.capture(&request).await.unwrap();
    let img = image::load_from_memory(&buffer).unwrap();
    assert_eq!((img.width(), img.height()), (160, 110));

    renderer.close().await;
}

#[tokio::test]
#[ignore = "requires chromedriver"]
async fn repeated_static_captures_have_identical_dimensions() {
    let renderer = Renderer::new(None);
    let mut request = CaptureRequest::new(InputSource::InlineMarkup(static_page()));
    request.scale = 1.0;
    request.smart_crop = false;

    let first = renderer.capture(&request).await.unwrap();
    let second = renderer.capture(&request).await.unwrap();
    let a = image::load_from_memory(&first).unwrap();
    let b = image::load_from_memory(&second).unwrap();
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));

    renderer.close().await;
}

#[tokio::test]
#[ignore = "requires chromedriver"]
async fn a_failed_request_leaves_the_engine_usable() {
    let renderer = Renderer::new(None);

    let mut bad = CaptureRequest::new(InputSource::LocalFile("/no/such/file.html".into()));
    bad.scale = 1.0;
    assert!(renderer.capture(&bad).await.is_err());

    let mut good = CaptureRequest::new(InputSource::InlineMarkup(static_page()));
    good.scale = 1.0;
    assert!(renderer.capture(&good).await.is_ok());

    renderer.close().await;
}

#[tokio::test]
#[ignore = "requires chromedriver"]
async fn webp_format_is_honored() {
    let renderer = Renderer::new(None);
    let mut request = CaptureRequest::new(InputSource::InlineMarkup(static_page()));
    request.scale = 1.0;
    request.format = ImageFormat::Webp;

    let buffer = renderer.capture(&request).await.unwrap();
    // RIFF....WEBP container header
    assert_eq!(&buffer[0..4], b"RIFF");
    assert_eq!(&buffer[8..12], b"WEBP");

    renderer.close().await;
}
