use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CaptureError;

/// The content a capture request renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Fetch and render a remote page
    RemoteUrl(String),
    /// Render the given markup directly
    InlineMarkup(String),
    /// Read a local file and render its contents as markup
    LocalFile(PathBuf),
}

/// Output encoding for the final image buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl ImageFormat {
    /// File extension used when persisting a rendered image
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }

    /// MIME type for HTTP responses serving the encoded buffer
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }
}

/// One capture's full parameter set. Immutable once the capture begins.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub input: InputSource,
    pub format: ImageFormat,
    /// Lossy-encoding quality, 1..=100. Applies to JPEG output only.
    pub quality: u8,
    /// Device-scale-factor: physical pixels per CSS pixel, >= 1
    pub scale: f64,
    pub full_page: bool,
    pub smart_crop: bool,
    /// Padding added around the computed content bounds, CSS pixels
    pub smart_crop_padding: u32,
    pub viewport_width: u32,
    /// Wait out network activity and unroll lazy-loaded content before capture
    pub dynamic_mode: bool,
    /// Watermark text to composite onto the output; None disables watermarking
    pub watermark: Option<String>,
}

impl CaptureRequest {
    /// Builds a request with the service defaults for the given input.
    pub fn new(input: InputSource) -> Self {
        Self {
            input,
            format: ImageFormat::Png,
            quality: 100,
            scale: 2.0,
            full_page: true,
            smart_crop: false,
            smart_crop_padding: 0,
            viewport_width: 1200,
            dynamic_mode: false,
            watermark: None,
        }
    }

    /// Rejects parameter combinations the pipeline cannot honor.
    ///
    /// Runs before any engine interaction so invalid requests never
    /// consume a render context.
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.quality < 1 || self.quality > 100 {
            return Err(CaptureError::invalid_request(format!(
                "quality must be within 1..=100, got {}",
                self.quality
            )));
        }
        if !self.scale.is_finite() || self.scale < 1.0 {
            return Err(CaptureError::invalid_request(format!(
                "scale must be a finite number >= 1, got {}",
                self.scale
            )));
        }
        if self.viewport_width == 0 {
            return Err(CaptureError::invalid_request(
                "viewport width must be greater than zero",
            ));
        }
        if let Some(text) = &self.watermark {
            if text.trim().is_empty() {
                return Err(CaptureError::invalid_request(
                    "watermark text must not be empty when watermarking is enabled",
                ));
            }
        }
        match &self.input {
            InputSource::RemoteUrl(raw) => {
                let parsed = url::Url::parse(raw).map_err(|e| {
                    CaptureError::invalid_request(format!("invalid URL {raw:?}: {e}"))
                })?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(CaptureError::invalid_request(format!(
                        "URL scheme must be http or https, got {:?}",
                        parsed.scheme()
                    )));
                }
            }
            InputSource::InlineMarkup(markup) => {
                if markup.trim().is_empty() {
                    return Err(CaptureError::invalid_request("inline markup is empty"));
                }
            }
            InputSource::LocalFile(_) => {}
        }
        Ok(())
    }
}

/// Tight bounding box of the visually meaningful page content, in
/// CSS-pixel, document-absolute coordinates.
///
/// All fields are non-negative and width/height are positive; "no
/// qualifying content" is represented by the absence of a bounds value,
/// never by a degenerate rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ContentBounds {
    /// Expands the accumulated union rectangle by `padding` on all four
    /// sides, clamping the origin at zero.
    pub fn from_union(left: f64, top: f64, right: f64, bottom: f64, padding: f64) -> Self {
        Self {
            x: (left - padding).max(0.0),
            y: (top - padding).max(0.0),
            width: (right - left) + padding * 2.0,
            height: (bottom - top) + padding * 2.0,
        }
    }

    /// Converts to device pixels: each field multiplied by the
    /// device-scale-factor and rounded to the nearest integer.
    pub fn to_physical(&self, scale: f64) -> PhysicalRect {
        PhysicalRect {
            x: (self.x * scale).round() as u32,
            y: (self.y * scale).round() as u32,
            width: (self.width * scale).round() as u32,
            height: (self.height * scale).round() as u32,
        }
    }
}

/// Crop rectangle in device (physical) pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
