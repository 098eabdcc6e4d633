//! Environment variable handling and .env file management

use crate::error::{AppError, ErrorContext, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load a .env file from the working directory if it exists
    pub fn load_env_file() -> Result<bool> {
        Self::load_env_file_from(Path::new(".env"))
    }

    /// Load the given .env file if it exists; variables already set win
    pub fn load_env_file_from(path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }

        dotenv::from_path(path).with_context(|| format!("Failed to load {}", path.display()))?;
        Ok(true)
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "SPEEDTEST_PORT" => {
                let port: u16 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_PORT value '{}': {}", value, e)))?;
                if port == 0 {
                    return Err(AppError::config("SPEEDTEST_PORT must be greater than 0"));
                }
            }
            "SPEEDTEST_LISTEN_ADDRESS" => {
                value.parse::<std::net::IpAddr>()
                    .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_LISTEN_ADDRESS value '{}': {}", value, e)))?;
            }
            "SPEEDTEST_SERVER" => {
                if !value.is_empty() {
                    value.parse::<u64>()
                        .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_SERVER value '{}': {}", value, e)))?;
                }
            }
            "SPEEDTEST_TIMEOUT" | "SPEEDTEST_CACHE_FOR" | "SPEEDTEST_INTERVAL" => {
                value.parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "SPEEDTEST_REQUIRE_BINARY" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_REQUIRE_BINARY value '{}': {}", value, e)))?;
            }
            "LOG_LEVEL" => {
                value.parse::<crate::logging::LogLevel>()?;
            }
            "LOG_FORMAT" => {
                value.parse::<crate::logging::LogFormat>()?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEEDTEST_PORT", "Port of the metrics endpoint", "9798"),
            ("SPEEDTEST_LISTEN_ADDRESS", "Address to bind", "0.0.0.0"),
            ("SPEEDTEST_SERVER", "Ookla server id to test against", "21541"),
            ("SPEEDTEST_TIMEOUT", "Seconds before the CLI is killed", "90"),
            ("SPEEDTEST_CACHE_FOR", "Seconds a result is reused by scrapes", "0"),
            ("SPEEDTEST_INTERVAL", "Background run period in seconds (0 = on scrape)", "0"),
            ("SPEEDTEST_BINARY", "Name or path of the speedtest CLI", "speedtest"),
            ("SPEEDTEST_REQUIRE_BINARY", "Exit at startup if the CLI is unusable", "false"),
            ("LOG_LEVEL", "trace, debug, info, warn or error", "info"),
            ("LOG_FORMAT", "logfmt, json or console", "logfmt"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<26} {}\n", var, description));
            help.push_str(&format!("  {:<26} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }
}
