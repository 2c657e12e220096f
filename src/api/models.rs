use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::renderer::model::{CaptureRequest, ImageFormat, InputSource};

/// JSON body for `POST /convert/url`
#[derive(Debug, Deserialize)]
pub struct ConvertUrlRequest {
    pub url: String,
    #[serde(default)]
    pub settings: CaptureSettings,
}

/// JSON body for `POST /convert/html`
#[derive(Debug, Deserialize)]
pub struct ConvertMarkupRequest {
    pub html: String,
    #[serde(default)]
    pub settings: CaptureSettings,
}

/// Client-facing capture settings.
///
/// Owns the defaulting and numeric coercion of request fields so the core
/// `CaptureRequest` only ever sees a fully resolved parameter set.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptureSettings {
    pub format: ImageFormat,
    pub quality: u8,
    pub scale: f64,
    /// Viewport width in CSS pixels
    pub width: u32,
    pub full_page: bool,
    pub smart_crop: bool,
    pub smart_crop_padding: u32,
    pub dynamic_mode: bool,
    pub watermark_enabled: bool,
    pub watermark_text: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: 100,
            scale: 2.0,
            width: 1200,
            full_page: true,
            smart_crop: false,
            smart_crop_padding: 0,
            dynamic_mode: false,
            watermark_enabled: false,
            watermark_text: String::new(),
        }
    }
}

impl CaptureSettings {
    /// Resolves the settings into an immutable capture request.
    pub fn to_request(&self, input: InputSource) -> CaptureRequest {
        CaptureRequest {
            input,
            format: self.format,
            quality: self.quality,
            scale: self.scale,
            full_page: self.full_page,
            smart_crop: self.smart_crop,
            smart_crop_padding: self.smart_crop_padding,
            viewport_width: self.width,
            dynamic_mode: self.dynamic_mode,
            watermark: if self.watermark_enabled && !self.watermark_text.is_empty() {
                Some(self.watermark_text.clone())
            } else {
                None
            },
        }
    }
}

/// Successful conversion response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,
    /// Retrieval path of the persisted image, e.g. `/temp/<uuid>.png`
    pub image_url: String,
}

/// Standard error response format for the API
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Response for the /health endpoint
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// healthy or degraded
    pub status: String,
    pub engine_running: bool,
    /// Captures currently being processed by workers
    pub active_captures: usize,
}

/// Internal job representation for the worker queue
#[derive(Debug)]
pub struct ConvertJob {
    pub request: CaptureRequest,
    /// Resolves with the persisted file name or an error message
    pub response_tx: oneshot::Sender<Result<String, String>>,
}
