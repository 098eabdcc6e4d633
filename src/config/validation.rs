//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
    types::RefreshMode,
};
use colored::Colorize;
use std::net::IpAddr;

/// Configuration validator with advisory rules on top of [`Config::validate`]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        // Hard errors first
        config.validate()?;

        warnings.extend(Self::validate_refresh_settings(config));
        warnings.extend(Self::validate_listen_settings(config));
        warnings.extend(Self::validate_binary_settings(config));

        Ok(warnings)
    }

    /// Check cache and interval against the run timeout
    fn validate_refresh_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let timeout = config.timeout();

        match config.refresh_mode() {
            RefreshMode::OnScrape { cache_for } => {
                if cache_for.is_zero() {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        "Every scrape starts a new speedtest; set SPEEDTEST_CACHE_FOR to reuse results".to_string(),
                    ));
                } else if cache_for < timeout {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!(
                            "Cache duration ({}s) is shorter than the timeout ({}s); results may expire before a slow run finishes",
                            cache_for.as_secs(),
                            timeout.as_secs()
                        ),
                    ));
                }
            }
            RefreshMode::Interval { every } => {
                if every < timeout {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!(
                            "Interval ({}s) is shorter than the timeout ({}s); ticks will be skipped while a run is in flight",
                            every.as_secs(),
                            timeout.as_secs()
                        ),
                    ));
                }
                if config.cache_for_seconds > 0 {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        "SPEEDTEST_CACHE_FOR is ignored when SPEEDTEST_INTERVAL is set".to_string(),
                    ));
                }
            }
        }

        warnings
    }

    /// Check the bind address
    fn validate_listen_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Ok(ip) = config.listen_address.parse::<IpAddr>() {
            if ip.is_unspecified() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Listening on all interfaces ({})", config.listen_address),
                ));
            }
        }

        if config.port < 1024 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Port {} is privileged and may require elevated permissions", config.port),
            ));
        }

        warnings
    }

    /// Check the speedtest CLI setting
    fn validate_binary_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.binary.contains('/') && !std::path::Path::new(&config.binary).exists() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Speedtest binary '{}' does not exist", config.binary),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if !use_color {
            return format!("{} {}", tag, self.message);
        }

        let tag = match self.level {
            ValidationLevel::Info => tag.blue(),
            ValidationLevel::Warning => tag.yellow(),
            ValidationLevel::Error => tag.red(),
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_warning(warnings: &[ValidationWarning], needle: &str) -> bool {
        warnings.iter().any(|w| w.level == ValidationLevel::Warning && w.message.contains(needle))
    }

    #[test]
    fn test_default_config_has_only_info() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(!warnings.is_empty());
        assert!(warnings.iter().all(|w| w.level == ValidationLevel::Info));
    }

    #[test]
    fn test_short_cache_warns() {
        let config = Config {
            cache_for_seconds: 30,
            ..Config::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "Cache duration (30s)"));
    }

    #[test]
    fn test_long_cache_is_quiet() {
        let config = Config {
            cache_for_seconds: 600,
            listen_address: "127.0.0.1".to_string(),
            ..Config::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_short_interval_warns() {
        let config = Config {
            interval_seconds: 60,
            ..Config::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "Interval (60s)"));
    }

    #[test]
    fn test_cache_ignored_in_interval_mode() {
        let config = Config {
            interval_seconds: 600,
            cache_for_seconds: 300,
            ..Config::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "ignored"));
    }

    #[test]
    fn test_missing_binary_path_warns() {
        let config = Config {
            binary: "/nonexistent/bin/speedtest".to_string(),
            ..Config::default()
        };
        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "does not exist"));
    }

    #[test]
    fn test_invalid_config_is_error() {
        let config = Config {
            timeout_seconds: 0,
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_warning_format_plain() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "check this".to_string());
        assert_eq!(warning.format(false), "[WARNING] check this");
    }
}
