//! Configuration data model and validation

use crate::logging::{LogFormat, LogLevel};
use crate::types::{AppError, RefreshMode, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Port the HTTP responder listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP responder binds to
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Ookla server id to pin tests to (unset lets the CLI choose)
    #[serde(default)]
    pub server_id: Option<String>,

    /// Seconds before a running speedtest is killed
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Seconds a result is reused by scrapes before the CLI runs again
    #[serde(default = "default_cache_for_secs")]
    pub cache_for_seconds: u64,

    /// Background measurement period in seconds; 0 runs on scrape instead
    #[serde(default = "default_interval_secs")]
    pub interval_seconds: u64,

    /// Name or path of the speedtest CLI
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Abort startup when the CLI is missing or unofficial
    #[serde(default)]
    pub require_binary: bool,

    /// Minimum log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log line format
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            listen_address: default_listen_address(),
            server_id: None,
            timeout_seconds: default_timeout_secs(),
            cache_for_seconds: default_cache_for_secs(),
            interval_seconds: default_interval_secs(),
            binary: default_binary(),
            require_binary: false,
            log_level: default_log_level(),
            log_format: default_log_format(),
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get cache lifetime as Duration
    pub fn cache_for(&self) -> Duration {
        Duration::from_secs(self.cache_for_seconds)
    }

    /// Get background interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    /// How measurements are triggered with this configuration
    pub fn refresh_mode(&self) -> RefreshMode {
        RefreshMode::from_durations(self.cache_for(), self.interval())
    }

    /// Socket address for the HTTP responder
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.listen_address.parse()
            .map_err(|e| AppError::config(format!("Invalid listen address '{}': {}", self.listen_address, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Parsed minimum log level
    pub fn log_level(&self) -> Result<LogLevel> {
        self.log_level.parse()
    }

    /// Parsed log format
    pub fn log_format(&self) -> Result<LogFormat> {
        self.log_format.parse()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(AppError::config("Port must be greater than 0"));
        }

        self.socket_addr()?;

        if let Some(server_id) = &self.server_id {
            if server_id.parse::<u64>().is_err() {
                return Err(AppError::config(format!("Server id must be numeric, got: {}", server_id)));
            }
        }

        if self.timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.timeout() > crate::defaults::MAX_TIMEOUT {
            return Err(AppError::config(format!(
                "Timeout cannot exceed {} seconds",
                crate::defaults::MAX_TIMEOUT.as_secs()
            )));
        }

        if self.interval_seconds != 0 && self.interval() < crate::defaults::MIN_INTERVAL {
            return Err(AppError::config(format!(
                "Interval must be 0 (run on scrape) or at least {} seconds, got: {}",
                crate::defaults::MIN_INTERVAL.as_secs(),
                self.interval_seconds
            )));
        }

        if self.binary.trim().is_empty() {
            return Err(AppError::config("Speedtest binary cannot be empty"));
        }

        self.log_level()?;
        self.log_format()?;

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("SPEEDTEST_PORT") {
            self.port = port.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_PORT value '{}': {}", port, e)))?;
        }

        if let Ok(address) = std::env::var("SPEEDTEST_LISTEN_ADDRESS") {
            if !address.trim().is_empty() {
                self.listen_address = address.trim().to_string();
            }
        }

        if let Ok(server_id) = std::env::var("SPEEDTEST_SERVER") {
            let server_id = server_id.trim();
            self.server_id = if server_id.is_empty() { None } else { Some(server_id.to_string()) };
        }

        if let Ok(timeout) = std::env::var("SPEEDTEST_TIMEOUT") {
            self.timeout_seconds = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_TIMEOUT value '{}': {}", timeout, e)))?;
        }

        if let Ok(cache_for) = std::env::var("SPEEDTEST_CACHE_FOR") {
            self.cache_for_seconds = cache_for.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_CACHE_FOR value '{}': {}", cache_for, e)))?;
        }

        if let Ok(interval) = std::env::var("SPEEDTEST_INTERVAL") {
            self.interval_seconds = interval.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_INTERVAL value '{}': {}", interval, e)))?;
        }

        if let Ok(binary) = std::env::var("SPEEDTEST_BINARY") {
            if !binary.trim().is_empty() {
                self.binary = binary.trim().to_string();
            }
        }

        if let Ok(require) = std::env::var("SPEEDTEST_REQUIRE_BINARY") {
            self.require_binary = require.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_REQUIRE_BINARY value '{}': {}", require, e)))?;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            if !level.trim().is_empty() {
                self.log_level = level.trim().to_string();
            }
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            if !format.trim().is_empty() {
                self.log_format = format.trim().to_string();
            }
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_port() -> u16 {
    crate::defaults::DEFAULT_PORT
}

fn default_listen_address() -> String {
    crate::defaults::DEFAULT_LISTEN_ADDRESS.to_string()
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_cache_for_secs() -> u64 {
    crate::defaults::DEFAULT_CACHE_FOR.as_secs()
}

fn default_interval_secs() -> u64 {
    crate::defaults::DEFAULT_INTERVAL.as_secs()
}

fn default_binary() -> String {
    crate::defaults::DEFAULT_BINARY.to_string()
}

fn default_log_level() -> String {
    crate::defaults::DEFAULT_LOG_LEVEL.to_string()
}

fn default_log_format() -> String {
    crate::defaults::DEFAULT_LOG_FORMAT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.port, 9798);
        assert_eq!(config.timeout_seconds, 90);
        assert_eq!(config.binary, "speedtest");
    }

    #[test]
    fn test_zero_port_invalid() {
        let mut config = Config::default();
        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_listen_address() {
        let mut config = Config::default();
        config.listen_address = "not-an-ip".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_numeric_server_id_invalid() {
        let mut config = Config::default();
        config.server_id = Some("abc".to_string());
        assert!(config.validate().is_err());

        config.server_id = Some("12345".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.timeout_seconds = 3601;
        assert!(config.validate().is_err());

        config.timeout_seconds = 3600;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_interval_invalid() {
        let mut config = Config::default();
        config.interval_seconds = 10;
        assert!(config.validate().is_err());

        config.interval_seconds = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_log_format_invalid() {
        let mut config = Config::default();
        config.log_format = "yaml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let mut config = Config::default();
        config.listen_address = "127.0.0.1".to_string();
        config.port = 9100;
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:9100".parse().unwrap());
    }

    #[test]
    fn test_refresh_mode_follows_interval() {
        let mut config = Config::default();
        assert_eq!(config.refresh_mode(), RefreshMode::OnScrape { cache_for: Duration::ZERO });

        config.interval_seconds = 600;
        assert_eq!(config.refresh_mode(), RefreshMode::Interval { every: Duration::from_secs(600) });
    }
}
