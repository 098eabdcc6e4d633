//! Type definitions and aliases

use std::time::Duration;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// How new measurements are triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshMode {
    /// A scrape runs the CLI when the cached result has expired
    OnScrape { cache_for: Duration },
    /// A background task runs the CLI on a fixed period; scrapes only read
    Interval { every: Duration },
}

impl RefreshMode {
    /// Pick the mode from the configured cache and interval durations
    pub fn from_durations(cache_for: Duration, interval: Duration) -> Self {
        if interval.is_zero() {
            Self::OnScrape { cache_for }
        } else {
            Self::Interval { every: interval }
        }
    }

    /// Human-readable description for startup logs
    pub fn describe(&self) -> String {
        match self {
            Self::OnScrape { cache_for } if cache_for.is_zero() => "on every scrape".to_string(),
            Self::OnScrape { cache_for } => format!("on scrape, cached for {}s", cache_for.as_secs()),
            Self::Interval { every } => format!("every {}s in the background", every.as_secs()),
        }
    }
}

/// Outcome of a single speedtest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// The CLI produced a valid result
    Success,
    /// The CLI failed, reported an error, or produced unusable output
    Failed,
    /// The CLI was killed after exceeding the timeout
    Timeout,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
            RunStatus::Timeout => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_means_on_scrape() {
        let mode = RefreshMode::from_durations(Duration::from_secs(60), Duration::ZERO);
        assert_eq!(mode, RefreshMode::OnScrape { cache_for: Duration::from_secs(60) });
    }

    #[test]
    fn test_interval_wins_over_cache() {
        let mode = RefreshMode::from_durations(Duration::from_secs(60), Duration::from_secs(300));
        assert_eq!(mode, RefreshMode::Interval { every: Duration::from_secs(300) });
        assert_eq!(mode.describe(), "every 300s in the background");
    }

    #[test]
    fn test_run_status_serializes_lowercase() {
        for status in [RunStatus::Success, RunStatus::Failed, RunStatus::Timeout] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(serde_json::from_str::<RunStatus>(&json).unwrap(), status);
        }
    }

    #[test]
    fn test_describe_on_every_scrape() {
        let mode = RefreshMode::OnScrape { cache_for: Duration::ZERO };
        assert_eq!(mode.describe(), "on every scrape");
    }
}
