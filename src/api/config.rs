use std::path::PathBuf;
use std::time::Duration;

/// Capacity of the conversion job queue; requests beyond it are rejected
pub const QUEUE_SIZE: usize = 100;

/// Configuration for the API server
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Directory rendered images are persisted under
    pub temp_dir: PathBuf,

    /// Optional external WebDriver URL (the engine is spawned if None)
    pub webdriver_url: Option<String>,

    /// End-to-end timeout a request waits for its capture result
    pub request_timeout: Duration,

    /// Rendered artifacts older than this are deleted by the sweeper
    pub retention: Duration,

    /// How often the sweeper runs
    pub sweep_interval: Duration,

    /// Number of capture worker tasks
    pub workers: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("temp"),
            webdriver_url: None,
            request_timeout: Duration::from_secs(120),
            retention: Duration::from_secs(3600),
            sweep_interval: Duration::from_secs(3600),
            workers: 4,
        }
    }
}
