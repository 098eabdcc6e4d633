//! Measurement record and the snapshot served to scrapers

use crate::types::RunStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of one speedtest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Ookla server id used for the test
    pub server_id: u64,

    /// Server name as reported by the CLI
    pub server_name: Option<String>,

    /// ISP as reported by the CLI
    pub isp: Option<String>,

    /// Jitter in milliseconds
    pub jitter_ms: f64,

    /// Idle ping latency in milliseconds
    pub ping_ms: f64,

    /// Download rate in bits per second
    pub download_bps: f64,

    /// Upload rate in bits per second
    pub upload_bps: f64,

    /// Packet loss percent, when the server supports measuring it
    pub packet_loss: Option<f64>,

    /// Share URL for the result
    pub result_url: Option<String>,

    /// When the run completed
    pub timestamp: DateTime<Utc>,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Outcome of the run
    pub status: RunStatus,

    /// Error message if the run failed
    pub error: Option<String>,
}

impl Measurement {
    /// Create a failed measurement with all values zeroed
    pub fn failed(error: String, duration: Duration) -> Self {
        Self::unsuccessful(RunStatus::Failed, error, duration)
    }

    /// Create a timed-out measurement with all values zeroed
    pub fn timeout(error: String, duration: Duration) -> Self {
        Self::unsuccessful(RunStatus::Timeout, error, duration)
    }

    fn unsuccessful(status: RunStatus, error: String, duration: Duration) -> Self {
        Self {
            server_id: 0,
            server_name: None,
            isp: None,
            jitter_ms: 0.0,
            ping_ms: 0.0,
            download_bps: 0.0,
            upload_bps: 0.0,
            packet_loss: None,
            result_url: None,
            timestamp: Utc::now(),
            duration,
            status,
            error: Some(error),
        }
    }

    /// Check if this run produced a usable result
    pub fn is_successful(&self) -> bool {
        matches!(self.status, RunStatus::Success)
    }

    /// Value of the `up` gauge
    pub fn up(&self) -> u8 {
        u8::from(self.is_successful())
    }

    /// One-line summary matching the exporter's result log line
    pub fn summary(&self) -> String {
        format!(
            "Server={} Jitter={}ms Ping={}ms Download={} Upload={}",
            self.server_id,
            self.jitter_ms,
            self.ping_ms,
            format_megabits(self.download_bps),
            format_megabits(self.upload_bps),
        )
    }
}

/// Convert a rate in bytes per second to bits per second
pub fn bytes_to_bits(bytes_per_sec: f64) -> f64 {
    bytes_per_sec * 8.0
}

/// Render bits per second as megabits rounded to two decimals, e.g. `12.35Mbps`
pub fn format_megabits(bits_per_sec: f64) -> String {
    let megabits = (bits_per_sec * 1e-6 * 100.0).round() / 100.0;
    format!("{}Mbps", megabits)
}

/// State handed to the metrics formatter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Last completed measurement, if any
    pub last: Option<Measurement>,

    /// Number of runs started since the process began
    pub runs_total: u64,

    /// Number of runs that did not produce a result
    pub failures_total: u64,

    /// Whether a run is currently in flight
    pub running: bool,
}

impl Snapshot {
    /// Empty snapshot served before the first run completes
    pub fn empty() -> Self {
        Self::default()
    }

    /// Value of the `up` gauge; 0 until a successful run exists
    pub fn up(&self) -> u8 {
        self.last.as_ref().map(Measurement::up).unwrap_or(0)
    }
}
