use fantoccini::{Client, ClientBuilder};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::CaptureError;
use crate::renderer::config;

/// An isolated, disposable rendering session.
///
/// Wraps one WebDriver session created with per-request Chrome
/// capabilities (viewport, device-scale-factor, user-agent). Sessions get
/// a fresh browser profile, so contexts never share cookies or storage.
/// The capture orchestrator disposes the context unconditionally once the
/// request resolves, on both success and failure paths.
pub struct RenderContext {
    client: Client,
}

impl RenderContext {
    pub async fn create(
        webdriver_url: &str,
        viewport_width: u32,
        scale: f64,
        user_agent: &str,
    ) -> Result<Self, CaptureError> {
        debug!(
            "Creating render context: width={}, scale={}",
            viewport_width, scale
        );
        let mut caps = serde_json::map::Map::new();
        let mut chrome_opts = serde_json::map::Map::new();

        let args = config::chrome_arguments(viewport_width, scale, user_agent);
        trace!("Chrome arguments: {:?}", args);
        chrome_opts.insert(
            "args".to_string(),
            Value::Array(args.into_iter().map(Value::String).collect()),
        );
        chrome_opts.insert(
            "prefs".to_string(),
            Value::Object(config::chrome_preferences()),
        );
        caps.insert(
            "goog:chromeOptions".to_string(),
            Value::Object(chrome_opts),
        );

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(webdriver_url)
            .await
            .map_err(|e| {
                CaptureError::session(format!(
                    "failed to open render session at {webdriver_url}: {e}"
                ))
            })?;

        Ok(Self { client })
    }

    pub async fn navigate(&self, url: &str) -> Result<(), CaptureError> {
        self.client
            .goto(url)
            .await
            .map_err(|e| CaptureError::load(format!("navigation failed: {e}")))
    }

    /// Evaluates a script against the live document and returns its
    /// structured result.
    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, CaptureError> {
        self.client
            .execute(script, args)
            .await
            .map_err(|e| CaptureError::session(format!("script evaluation failed: {e}")))
    }

    /// Resizes the rendering surface; in headless mode the window size is
    /// the viewport size.
    pub async fn resize(&self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.client
            .set_window_size(width, height)
            .await
            .map_err(|e| {
                CaptureError::session(format!("failed to resize viewport to {width}x{height}: {e}"))
            })
    }

    /// Captures the current page as a PNG bitmap at device-pixel
    /// resolution.
    pub async fn capture_bitmap(&self) -> Result<Vec<u8>, CaptureError> {
        let data = self
            .client
            .screenshot()
            .await
            .map_err(|e| CaptureError::session(format!("bitmap capture failed: {e}")))?;
        trace!("Captured bitmap, {} bytes", data.len());
        Ok(data)
    }

    /// Destroys the session. Never fails the enclosing capture: disposal
    /// errors are logged and swallowed.
    pub async fn dispose(self) {
        if let Err(e) = self.client.close().await {
            warn!("Failed to close render context: {}", e);
        } else {
            trace!("Render context disposed");
        }
    }
}
