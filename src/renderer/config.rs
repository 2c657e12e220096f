use std::time::Duration;

// Engine lifecycle
pub const DEFAULT_WEBDRIVER_PORT: u16 = 4444;
pub const ENGINE_LAUNCH_TIMEOUT: Duration = Duration::from_secs(15); // Bound on the readiness probe
pub const ENGINE_PROBE_INTERVAL: Duration = Duration::from_millis(250);

// Page load and stabilization
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(60);
pub const FONT_WAIT_TIMEOUT: Duration = Duration::from_secs(3);
pub const FONT_POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const STATIC_SETTLE: Duration = Duration::from_millis(200); // Brief stability wait for static pages
pub const DYNAMIC_SETTLE: Duration = Duration::from_millis(1000); // Final stability wait after dynamic processing

// Dynamic content unrolling
pub const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(10);
pub const NETWORK_IDLE_POLL: Duration = Duration::from_millis(500);
pub const MIN_SCROLL_REGION: u32 = 300; // Ignore scroll areas shorter than this (code blocks, small lists)
pub const SCROLL_STEP_PAUSE: Duration = Duration::from_millis(200);
pub const SCROLL_SETTLE_PAUSE: Duration = Duration::from_millis(1000);
pub const MAX_SCROLL_STEPS: u32 = 500; // Hard cap so continuously growing pages cannot loop forever
pub const UNROLL_RELAYOUT_PAUSE: Duration = Duration::from_millis(500);

// Capture geometry
pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 900;
pub const MAX_CAPTURE_HEIGHT: u32 = 16_384; // Chromium's raster surface ceiling, logical pixels
pub const RESIZE_SETTLE: Duration = Duration::from_millis(200);

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

// Chrome browser arguments for one render context
pub fn chrome_arguments(viewport_width: u32, scale: f64, user_agent: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--headless=new",
        "--no-sandbox",
        "--disable-gpu",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-notifications",
        "--disable-infobars",
        "--disable-popup-blocking",
        "--disable-background-networking",
        "--disable-background-timer-throttling",
        "--disable-backgrounding-occluded-windows",
        "--disable-breakpad",
        "--disable-component-extensions-with-background-pages",
        "--disable-features=TranslateUI",
        "--disable-ipc-flooding-protection",
        "--disable-renderer-backgrounding",
        "--enable-features=NetworkService,NetworkServiceInProcess",
        "--force-color-profile=srgb",
        "--font-render-hinting=none",
        "--hide-scrollbars",
        "--metrics-recording-only",
        "--mute-audio",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    args.push(format!(
        "--window-size={},{}",
        viewport_width, DEFAULT_VIEWPORT_HEIGHT
    ));
    args.push(format!("--force-device-scale-factor={}", scale));
    args.push(format!("--user-agent={}", user_agent));
    args
}

// Chrome content settings preferences
pub fn chrome_preferences() -> serde_json::Map<String, serde_json::Value> {
    let mut prefs = serde_json::Map::new();
    prefs.insert("profile.default_content_setting_values.images".to_string(), 1.into()); // 1 = allow
    prefs.insert("profile.managed_default_content_settings.javascript".to_string(), 1.into()); // 1 = allow
    prefs.insert("profile.managed_default_content_settings.plugins".to_string(), 2.into()); // 2 = block
    prefs.insert("profile.managed_default_content_settings.popups".to_string(), 2.into()); // 2 = block
    prefs.insert("profile.managed_default_content_settings.geolocation".to_string(), 2.into()); // 2 = block
    prefs.insert("profile.managed_default_content_settings.media_stream".to_string(), 2.into()); // 2 = block
    prefs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_arguments_carry_per_context_settings() {
        let args = chrome_arguments(1200, 2.0, USER_AGENT);
        assert!(args.contains(&"--window-size=1200,900".to_string()));
        assert!(args.contains(&"--force-device-scale-factor=2".to_string()));
        assert!(args.iter().any(|a| a.starts_with("--user-agent=Mozilla/5.0")));
        assert!(args.contains(&"--headless=new".to_string()));
    }
}
