//! Metrics formatting
//!
//! Turns a [`Snapshot`] of the poller into text for scrapers (Prometheus
//! exposition format) or for humans and scripts (JSON).

mod prometheus;

pub use prometheus::{PrometheusFormatter, PROMETHEUS_CONTENT_TYPE};

use crate::error::{AppError, Result};
use crate::models::Snapshot;
use serde::Serialize;

/// Main trait for metrics formatting
pub trait MetricsFormatter: Send + Sync {
    /// HTTP content type of the rendered text
    fn content_type(&self) -> &'static str;

    /// Render a snapshot
    fn format(&self, snapshot: &Snapshot) -> String;
}

/// Renders a snapshot as pretty-printed JSON
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonView<'a> {
    up: u8,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

impl MetricsFormatter for JsonFormatter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn format(&self, snapshot: &Snapshot) -> String {
        let view = JsonView { up: snapshot.up(), snapshot };
        serde_json::to_string_pretty(&view)
            .unwrap_or_else(|e| format!("{{\"error\": {:?}}}", e.to_string()))
    }
}

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Prometheus,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "prometheus" | "text" => Ok(Self::Prometheus),
            "json" => Ok(Self::Json),
            _ => Err(AppError::config(format!("Unknown output format: {}", s))),
        }
    }
}

/// Output formatting factory
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter for the requested format
    pub fn create(format: OutputFormat) -> Box<dyn MetricsFormatter> {
        match format {
            OutputFormat::Prometheus => Box::new(PrometheusFormatter::new()),
            OutputFormat::Json => Box::new(JsonFormatter),
        }
    }
}
