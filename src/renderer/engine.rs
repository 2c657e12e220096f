use std::process::Stdio;
use std::time::Instant;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::error::CaptureError;
use crate::renderer::config::{
    DEFAULT_WEBDRIVER_PORT, ENGINE_LAUNCH_TIMEOUT, ENGINE_PROBE_INTERVAL,
};

enum EngineState {
    Idle,
    /// `child` is None when attached to an externally managed WebDriver
    Running { child: Option<Child> },
}

/// Process-wide handle to the single rendering engine.
///
/// Owns the chromedriver child process (or a connection to an external
/// WebDriver endpoint) shared by every capture. Launch state lives behind
/// a mutex so concurrent `init` calls serialize: the first caller launches,
/// later callers observe the running state and return.
pub struct Engine {
    webdriver_url: String,
    managed: bool,
    port: u16,
    state: Mutex<EngineState>,
}

impl Engine {
    /// Creates a handle. With `webdriver_url` set the engine attaches to
    /// that endpoint instead of spawning chromedriver itself.
    pub fn new(webdriver_url: Option<&str>) -> Self {
        match webdriver_url {
            Some(url) => Self {
                webdriver_url: url.trim_end_matches('/').to_string(),
                managed: false,
                port: 0,
                state: Mutex::new(EngineState::Idle),
            },
            None => Self {
                webdriver_url: format!("http://localhost:{}", DEFAULT_WEBDRIVER_PORT),
                managed: true,
                port: DEFAULT_WEBDRIVER_PORT,
                state: Mutex::new(EngineState::Idle),
            },
        }
    }

    pub fn webdriver_url(&self) -> &str {
        &self.webdriver_url
    }

    /// Launches the engine at most once.
    ///
    /// On launch failure the spawned child is killed and the state reverts
    /// to idle, so a later `init` retries from scratch rather than finding
    /// a half-initialized handle.
    pub async fn init(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock().await;
        if matches!(*state, EngineState::Running { .. }) {
            trace!("rendering engine already running");
            return Ok(());
        }

        if self.managed {
            info!("Launching chromedriver on port {}", self.port);
            let mut child = Command::new("chromedriver")
                .arg(format!("--port={}", self.port))
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    CaptureError::launch(format!("failed to spawn chromedriver: {e}"))
                })?;

            if let Err(e) = self.wait_until_ready().await {
                warn!("Engine readiness probe failed, killing chromedriver");
                if let Err(kill_err) = child.kill().await {
                    warn!("Failed to kill chromedriver after launch failure: {}", kill_err);
                }
                return Err(e);
            }
            *state = EngineState::Running { child: Some(child) };
        } else {
            debug!("Attaching to external WebDriver at {}", self.webdriver_url);
            self.wait_until_ready().await?;
            *state = EngineState::Running { child: None };
        }

        info!("Rendering engine ready at {}", self.webdriver_url);
        Ok(())
    }

    /// Polls the WebDriver /status endpoint until it responds or the
    /// launch timeout expires.
    async fn wait_until_ready(&self) -> Result<(), CaptureError> {
        let status_url = format!("{}/status", self.webdriver_url);
        let deadline = Instant::now() + ENGINE_LAUNCH_TIMEOUT;

        loop {
            match reqwest::get(&status_url).await {
                Ok(response) if response.status().is_success() => {
                    trace!("WebDriver status endpoint responded");
                    return Ok(());
                }
                Ok(response) => {
                    trace!("WebDriver status returned {}", response.status());
                }
                Err(e) => {
                    trace!("WebDriver status probe failed: {}", e);
                }
            }
            if Instant::now() >= deadline {
                return Err(CaptureError::launch(format!(
                    "WebDriver at {} not ready within {:?}",
                    self.webdriver_url, ENGINE_LAUNCH_TIMEOUT
                )));
            }
            sleep(ENGINE_PROBE_INTERVAL).await;
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, EngineState::Running { .. })
    }

    /// Terminates the engine and invalidates the handle. A later `init`
    /// launches a fresh process.
    pub async fn close(&self) {
        let mut state = self.state.lock().await;
        if let EngineState::Running { child } =
            std::mem::replace(&mut *state, EngineState::Idle)
        {
            if let Some(mut child) = child {
                info!("Terminating chromedriver");
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill chromedriver: {}", e);
                }
            }
        }
    }
}
