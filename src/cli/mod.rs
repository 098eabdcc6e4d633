//! Command-line interface

use clap::{Parser, Subcommand};

/// Speedtest Exporter - republishes Ookla speedtest results as Prometheus metrics
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "speedtest-exporter")]
#[command(version, about, long_about = None)]
#[command(long_version = crate::long_version())]
#[command(after_help = crate::config::EnvManager::display_env_help())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Port the metrics endpoint listens on [env: SPEEDTEST_PORT]
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Address to bind [env: SPEEDTEST_LISTEN_ADDRESS]
    #[arg(long, global = true)]
    pub listen_address: Option<String>,

    /// Ookla server id to test against [env: SPEEDTEST_SERVER]
    #[arg(short, long, global = true)]
    pub server_id: Option<String>,

    /// Seconds before a running speedtest is killed [env: SPEEDTEST_TIMEOUT]
    #[arg(short, long, global = true)]
    pub timeout: Option<u64>,

    /// Seconds a result is reused by scrapes [env: SPEEDTEST_CACHE_FOR]
    #[arg(long, global = true)]
    pub cache_for: Option<u64>,

    /// Run in the background every N seconds instead of on scrape [env: SPEEDTEST_INTERVAL]
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Name or path of the speedtest CLI [env: SPEEDTEST_BINARY]
    #[arg(long, global = true)]
    pub binary: Option<String>,

    /// Exit at startup if the official speedtest CLI is unusable [env: SPEEDTEST_REQUIRE_BINARY]
    #[arg(long, global = true)]
    pub require_binary: bool,

    /// Log level: trace, debug, info, warn, error [env: LOG_LEVEL]
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format: logfmt, json, console [env: LOG_FORMAT]
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Subcommands; serving is the default
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Serve metrics over HTTP (default)
    Serve,

    /// Run one speedtest and print the metrics
    Probe {
        /// Print JSON instead of Prometheus text
        #[arg(long)]
        json: bool,
    },

    /// Check that the local metrics endpoint answers
    Healthcheck {
        /// Path to request
        #[arg(long, default_value = crate::defaults::DEFAULT_HEALTHCHECK_PATH)]
        path: String,

        /// Seconds to wait for a response
        #[arg(long = "wait", default_value_t = crate::defaults::DEFAULT_HEALTHCHECK_TIMEOUT.as_secs())]
        wait: u64,
    },
}

impl Cli {
    /// Command to run, defaulting to `serve`
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(cache_for), Some(interval)) = (self.cache_for, self.interval) {
            if cache_for > 0 && interval > 0 {
                return Err("--cache-for has no effect together with --interval".to_string());
            }
        }

        if let Some(Command::Healthcheck { path, wait }) = &self.command {
            if !path.starts_with('/') {
                return Err(format!("Healthcheck path must start with '/', got: {}", path));
            }
            if *wait == 0 {
                return Err("Healthcheck wait must be greater than 0".to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_long_version_includes_build_details() {
        let version = <Cli as CommandFactory>::command().render_long_version();
        assert!(version.contains(crate::VERSION));
        assert!(version.contains("commit "));
        assert!(version.contains("built "));
    }

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["speedtest-exporter"]).unwrap();
        assert_eq!(cli.command(), Command::Serve);
        assert!(cli.port.is_none());
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "speedtest-exporter", "--port", "9100", "--server-id", "21541", "--timeout", "60",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(9100));
        assert_eq!(cli.server_id.as_deref(), Some("21541"));
        assert_eq!(cli.timeout, Some(60));
    }

    #[test]
    fn test_probe_json() {
        let cli = Cli::try_parse_from(["speedtest-exporter", "probe", "--json"]).unwrap();
        assert_eq!(cli.command(), Command::Probe { json: true });
    }

    #[test]
    fn test_healthcheck_defaults() {
        let cli = Cli::try_parse_from(["speedtest-exporter", "healthcheck", "--port", "9100"]).unwrap();
        assert_eq!(cli.command(), Command::Healthcheck { path: "/".to_string(), wait: 5 });
        assert_eq!(cli.port, Some(9100));
    }

    #[test]
    fn test_cache_and_interval_conflict() {
        let cli = Cli::try_parse_from(["speedtest-exporter", "--cache-for", "60", "--interval", "600"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_healthcheck_path_must_be_absolute() {
        let cli = Cli::try_parse_from(["speedtest-exporter", "healthcheck", "--path", "metrics"]).unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_invalid_port_rejected_by_parser() {
        assert!(Cli::try_parse_from(["speedtest-exporter", "--port", "70000"]).is_err());
    }
}
