//! Error types for the capture pipeline.

use thiserror::Error;

/// Errors surfaced by the renderer and the image post-processor.
///
/// Launch failures are process-wide: no capture can proceed until the
/// engine is initialized again. Every other variant resolves only the
/// request that produced it and leaves the shared engine usable.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The rendering engine process failed to start or become ready
    #[error("rendering engine launch failed: {0}")]
    Launch(String),

    /// The request was rejected before any engine interaction
    #[error("invalid capture request: {0}")]
    InvalidRequest(String),

    /// Navigation or content-set did not complete within the load timeout
    #[error("page load failed: {0}")]
    Load(String),

    /// The per-request render session failed mid-capture
    #[error("render session failed: {0}")]
    Session(String),

    /// Cropping or compositing the captured bitmap failed
    #[error("image extraction failed: {0}")]
    Extraction(String),

    /// Encoding the final buffer failed
    #[error("image encoding failed: {0}")]
    Encoding(String),
}

impl CaptureError {
    pub fn launch(msg: impl Into<String>) -> Self {
        Self::Launch(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}
