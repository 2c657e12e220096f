//! webshot_api: render web content (remote pages, inline markup, local
//! markup files) into raster images, with optional smart cropping and
//! watermarking.

pub mod api;
pub mod error;
pub mod image_proc;
pub mod renderer;
pub mod utils;

pub use error::CaptureError;
pub use renderer::model::{CaptureRequest, ContentBounds, ImageFormat, InputSource};
pub use renderer::Renderer;
