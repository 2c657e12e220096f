use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use webshot_api::api::config::ApiConfig;
use webshot_api::api::start_server;
use webshot_api::utils::logger::init_logger;

/// Web-to-image rendering service
#[derive(Parser, Debug)]
#[command(name = "webshot_api", version, about)]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3015)]
    port: u16,

    /// Directory rendered images are persisted under
    #[arg(long, default_value = "temp")]
    temp_dir: PathBuf,

    /// Directory log files are written to
    #[arg(long, default_value = "logs")]
    log_dir: String,

    /// Attach to an external WebDriver instead of spawning chromedriver
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Number of capture worker tasks
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// End-to-end request timeout in seconds
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let _ = init_logger(&args.log_dir);

    let config = ApiConfig {
        temp_dir: args.temp_dir,
        webdriver_url: args.webdriver_url,
        request_timeout: Duration::from_secs(args.request_timeout),
        workers: args.workers,
        ..ApiConfig::default()
    };

    start_server(&args.host, args.port, config).await
}
