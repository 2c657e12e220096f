use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Instant;
use tokio::time::{sleep, timeout};
use tracing::{debug, trace, warn};

use crate::error::CaptureError;
use crate::renderer::config::{FONT_POLL_INTERVAL, FONT_WAIT_TIMEOUT, LOAD_TIMEOUT};
use crate::renderer::context::RenderContext;
use crate::renderer::model::InputSource;

/// Injected after load so repeated captures of the same static state are
/// pixel-stable: animation and transition timing is zeroed out and
/// scrollbars are hidden.
const STABILIZE_STYLE: &str = "\
    *, *::before, *::after { \
        animation-duration: 0s !important; \
        transition-duration: 0s !important; \
        animation-delay: 0s !important; \
        transition-delay: 0s !important; \
    } \
    body::-webkit-scrollbar { display: none; }";

const INJECT_STYLE_JS: &str = "\
    const style = document.createElement('style'); \
    style.textContent = arguments[0]; \
    document.head.appendChild(style); \
    return true;";

const FONT_STATUS_JS: &str = "return document.fonts ? document.fonts.status : 'loaded';";

/// Loads the requested content variant into the context.
///
/// Remote URLs navigate directly; inline markup and local files render
/// through a base64 data URL. The whole load is bounded by the load
/// timeout; exceeding it fails this request only.
pub async fn load(context: &RenderContext, input: &InputSource) -> Result<(), CaptureError> {
    let url = match input {
        InputSource::RemoteUrl(url) => {
            debug!("Loading remote URL: {}", url);
            url.clone()
        }
        InputSource::InlineMarkup(markup) => {
            debug!("Loading inline markup, {} bytes", markup.len());
            markup_data_url(markup)
        }
        InputSource::LocalFile(path) => {
            debug!("Loading local file: {}", path.display());
            let markup = tokio::fs::read_to_string(path).await.map_err(|e| {
                CaptureError::load(format!("failed to read {}: {e}", path.display()))
            })?;
            markup_data_url(&markup)
        }
    };

    match timeout(LOAD_TIMEOUT, context.navigate(&url)).await {
        Ok(result) => result,
        Err(_) => Err(CaptureError::load(format!(
            "load did not complete within {LOAD_TIMEOUT:?}"
        ))),
    }
}

/// Neutralizes animation timing and waits for font resources.
///
/// Style injection failing means the session is broken and the error
/// propagates; an unobservable font-readiness signal is non-fatal and the
/// capture proceeds.
pub async fn stabilize(context: &RenderContext) -> Result<(), CaptureError> {
    context
        .execute(INJECT_STYLE_JS, vec![STABILIZE_STYLE.into()])
        .await?;
    trace!("Stabilization styles injected");

    let deadline = Instant::now() + FONT_WAIT_TIMEOUT;
    loop {
        match context.execute(FONT_STATUS_JS, vec![]).await {
            Ok(value) if value.as_str() == Some("loaded") => {
                trace!("Fonts loaded");
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Font readiness check failed, proceeding anyway: {}", e);
                return Ok(());
            }
        }
        if Instant::now() >= deadline {
            warn!("Fonts still loading after {:?}, proceeding anyway", FONT_WAIT_TIMEOUT);
            return Ok(());
        }
        sleep(FONT_POLL_INTERVAL).await;
    }
}

fn markup_data_url(markup: &str) -> String {
    format!(
        "data:text/html;charset=utf-8;base64,{}",
        BASE64.encode(markup.as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_data_url_is_base64_encoded() {
        let url = markup_data_url("<p>héllo</p>");
        assert!(url.starts_with("data:text/html;charset=utf-8;base64,"));
        let encoded = url.rsplit(',').next().unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "<p>héllo</p>");
    }
}
