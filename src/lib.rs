//! Speedtest Exporter
//!
//! Runs the Ookla speedtest CLI on demand or on a schedule and republishes the
//! last result in Prometheus text exposition format over HTTP.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod healthcheck;
pub mod logging;
pub mod models;
pub mod output;
pub mod poller;
pub mod server;
pub mod speedtest;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, Measurement, Snapshot};
pub use output::{MetricsFormatter, PrometheusFormatter, JsonFormatter, OutputFormatterFactory};
pub use poller::Poller;
pub use speedtest::{SpeedtestRunner, CliRunner};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Git commit the binary was built from, when known
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");
pub const BUILD_TIME: Option<&str> = option_env!("BUILD_TIME");
pub const TARGET_TRIPLE: Option<&str> = option_env!("TARGET_TRIPLE");

/// Version line with build details, shown by `--version`
pub fn long_version() -> String {
    format!(
        "{} (commit {}, built {}, {})",
        VERSION,
        GIT_COMMIT.unwrap_or("unknown"),
        BUILD_TIME.unwrap_or("unknown"),
        TARGET_TRIPLE.unwrap_or("unknown")
    )
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 9798;
    pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);
    pub const DEFAULT_CACHE_FOR: Duration = Duration::ZERO;
    pub const DEFAULT_INTERVAL: Duration = Duration::ZERO;
    pub const MIN_INTERVAL: Duration = Duration::from_secs(30);
    pub const MAX_TIMEOUT: Duration = Duration::from_secs(3600);
    pub const DEFAULT_BINARY: &str = "speedtest";
    pub const DEFAULT_LOG_LEVEL: &str = "info";
    pub const DEFAULT_LOG_FORMAT: &str = "logfmt";
    pub const DEFAULT_HEALTHCHECK_PATH: &str = "/";
    pub const DEFAULT_HEALTHCHECK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Marker printed by the official CLI in `--version` output
    pub const OFFICIAL_CLI_MARKER: &str = "Speedtest by Ookla";
    pub const CLI_DOWNLOAD_URL: &str = "https://www.speedtest.net/apps/cli";
}
