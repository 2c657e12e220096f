//! The capture pipeline.
//!
//! One `Renderer` owns the process-wide rendering engine; each capture
//! runs load → stabilize → [unroll] → bounds → bitmap → post-process
//! inside its own disposable render context.

mod bounds;
pub mod config;
mod context;
mod engine;
mod loader;
pub mod model;
mod scroll;

use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::error::CaptureError;
use crate::image_proc::{self, PostProcessOptions};
use crate::renderer::context::RenderContext;
use crate::renderer::engine::Engine;
use crate::renderer::model::CaptureRequest;

const DOCUMENT_HEIGHT_JS: &str = "\
    return Math.max( \
        document.body ? document.body.scrollHeight : 0, \
        document.documentElement.scrollHeight);";

/// Converts web content into encoded raster images.
pub struct Renderer {
    engine: Engine,
}

impl Renderer {
    /// Creates a renderer. With `webdriver_url` set it attaches to an
    /// externally managed WebDriver instead of spawning chromedriver.
    pub fn new(webdriver_url: Option<&str>) -> Self {
        Self {
            engine: Engine::new(webdriver_url),
        }
    }

    /// Launches the rendering engine. Idempotent; concurrent calls cannot
    /// trigger a second launch.
    pub async fn init(&self) -> Result<(), CaptureError> {
        self.engine.init().await
    }

    pub async fn is_running(&self) -> bool {
        self.engine.is_running().await
    }

    /// Terminates the rendering engine.
    pub async fn close(&self) {
        self.engine.close().await;
    }

    /// Runs one capture end to end and returns the encoded image buffer.
    ///
    /// Creates exactly one render context and destroys it on both success
    /// and failure paths. Per-request failures leave the engine usable for
    /// subsequent captures.
    #[instrument(skip(self, request), fields(format = ?request.format, scale = request.scale))]
    pub async fn capture(&self, request: &CaptureRequest) -> Result<Vec<u8>, CaptureError> {
        request.validate()?;
        self.engine.init().await?;

        info!(
            "Capture started: width={}, full_page={}, smart_crop={}, dynamic={}",
            request.viewport_width, request.full_page, request.smart_crop, request.dynamic_mode
        );

        let context = RenderContext::create(
            self.engine.webdriver_url(),
            request.viewport_width,
            request.scale,
            config::USER_AGENT,
        )
        .await?;

        let outcome = self.capture_in_context(&context, request).await;
        context.dispose().await;

        match &outcome {
            Ok(buffer) => info!("Capture complete, {} bytes", buffer.len()),
            Err(e) => warn!("Capture failed: {}", e),
        }
        outcome
    }

    async fn capture_in_context(
        &self,
        context: &RenderContext,
        request: &CaptureRequest,
    ) -> Result<Vec<u8>, CaptureError> {
        loader::load(context, &request.input).await?;
        loader::stabilize(context).await?;

        if request.dynamic_mode {
            debug!("Dynamic mode: processing lazy content");
            if request.full_page {
                scroll::unroll(context).await;
            } else {
                scroll::wait_for_network_idle(context).await;
            }
            sleep(config::DYNAMIC_SETTLE).await;
        } else {
            sleep(config::STATIC_SETTLE).await;
        }

        let bounds = if request.smart_crop {
            bounds::content_bounds(context, request.smart_crop_padding).await
        } else {
            None
        };

        let bitmap = self.capture_bitmap(context, request).await?;

        let options = PostProcessOptions {
            bounds,
            scale: request.scale,
            format: request.format,
            quality: request.quality,
            watermark: request.watermark.as_deref(),
        };
        image_proc::process(&bitmap, &options)
    }

    /// Captures the page bitmap. Full-page capture grows the rendering
    /// surface to the document height first; smart cropping always needs
    /// the full document since bounds are document-absolute.
    async fn capture_bitmap(
        &self,
        context: &RenderContext,
        request: &CaptureRequest,
    ) -> Result<Vec<u8>, CaptureError> {
        if request.full_page || request.smart_crop {
            let document_height = context
                .execute(DOCUMENT_HEIGHT_JS, vec![])
                .await?
                .as_f64()
                .unwrap_or(0.0);
            if document_height > config::MAX_CAPTURE_HEIGHT as f64 {
                warn!(
                    "Document height {} exceeds capture ceiling, clamping to {}",
                    document_height,
                    config::MAX_CAPTURE_HEIGHT
                );
            }
            let height = document_height
                .ceil()
                .max(config::DEFAULT_VIEWPORT_HEIGHT as f64)
                .min(config::MAX_CAPTURE_HEIGHT as f64) as u32;
            if height > config::DEFAULT_VIEWPORT_HEIGHT {
                debug!("Resizing surface to {}x{} for full-page capture", request.viewport_width, height);
                context.resize(request.viewport_width, height).await?;
                sleep(config::RESIZE_SETTLE).await;
            }
        }
        context.capture_bitmap().await
    }
}
