//! Parsing of the speedtest CLI JSON report

use crate::error::{AppError, Result};
use crate::models::{bytes_to_bits, Measurement};
use crate::types::RunStatus;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    ping: Ping,
    download: Transfer,
    upload: Transfer,
    server: Server,
    #[serde(default)]
    isp: Option<String>,
    #[serde(default)]
    packet_loss: Option<f64>,
    #[serde(default)]
    result: Option<ResultLink>,
}

#[derive(Debug, Deserialize)]
struct Ping {
    jitter: f64,
    latency: f64,
}

/// Bandwidth is reported in bytes per second
#[derive(Debug, Deserialize)]
struct Transfer {
    bandwidth: f64,
}

#[derive(Debug, Deserialize)]
struct Server {
    id: ServerId,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServerId {
    Number(u64),
    Text(String),
}

impl ServerId {
    fn value(&self) -> Result<u64> {
        match self {
            ServerId::Number(id) => Ok(*id),
            ServerId::Text(text) => text.trim().parse()
                .map_err(|_| AppError::parse(format!("Server id is not numeric: {}", text))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResultLink {
    #[serde(default)]
    url: Option<String>,
}

/// Turn the CLI's JSON output into a measurement
///
/// The returned measurement has a zero duration; the caller knows how long the
/// run took.
pub fn parse_report(output: &[u8]) -> Result<Measurement> {
    if output.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::parse("Speedtest produced no output"));
    }

    let value: serde_json::Value = serde_json::from_slice(output)
        .map_err(|e| AppError::parse(format!("Speedtest output is not valid JSON: {}", e)))?;

    if let Some(error) = value.get("error") {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(AppError::process(format!("Speedtest error: {}", message)));
    }

    match value.get("type").and_then(serde_json::Value::as_str) {
        Some("result") => {}
        Some(other) => return Err(AppError::parse(format!("Unexpected result type: {}", other))),
        None => return Err(AppError::parse("Speedtest output has no result type")),
    }

    let report: Report = serde_json::from_value(value)
        .map_err(|e| AppError::parse(format!("Error parsing speedtest result: {}", e)))?;

    Ok(Measurement {
        server_id: report.server.id.value()?,
        server_name: report.server.name,
        isp: report.isp,
        jitter_ms: report.ping.jitter,
        ping_ms: report.ping.latency,
        download_bps: bytes_to_bits(report.download.bandwidth),
        upload_bps: bytes_to_bits(report.upload.bandwidth),
        packet_loss: report.packet_loss,
        result_url: report.result.and_then(|r| r.url),
        timestamp: Utc::now(),
        duration: Duration::ZERO,
        status: RunStatus::Success,
        error: None,
    })
}

/// Pull the message out of an `{"error": ...}` document, if the bytes are one
pub fn error_message(output: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(output).ok()?;
    let error = value.get("error")?;
    Some(error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()))
}
