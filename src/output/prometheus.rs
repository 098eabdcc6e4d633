//! Prometheus text exposition format

use super::MetricsFormatter;
use crate::models::Snapshot;
use std::fmt::Write as _;

/// Content type of the text exposition format
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Renders a snapshot as Prometheus gauges and counters
#[derive(Debug, Clone)]
pub struct PrometheusFormatter {
    namespace: String,
    version: String,
}

impl Default for PrometheusFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl PrometheusFormatter {
    /// Create a formatter with the `speedtest` namespace
    pub fn new() -> Self {
        Self::with_namespace("speedtest")
    }

    /// Create a formatter with a custom namespace
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version: crate::VERSION.to_string(),
        }
    }

    fn write_metric(&self, output: &mut String, kind: &str, name: &str, help: &str, value: f64) {
        self.write_metric_with_labels(output, kind, name, help, value, &[]);
    }

    fn write_metric_with_labels(
        &self,
        output: &mut String,
        kind: &str,
        name: &str,
        help: &str,
        value: f64,
        labels: &[(&str, &str)],
    ) {
        let full_name = format!("{}_{}", self.namespace, name);
        let _ = writeln!(output, "# HELP {} {}", full_name, help);
        let _ = writeln!(output, "# TYPE {} {}", full_name, kind);

        if labels.is_empty() {
            let _ = writeln!(output, "{} {}", full_name, format_value(value));
        } else {
            let labels_str = labels
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
                .collect::<Vec<_>>()
                .join(",");
            let _ = writeln!(output, "{}{{{}}} {}", full_name, labels_str, format_value(value));
        }
    }
}

impl MetricsFormatter for PrometheusFormatter {
    fn content_type(&self) -> &'static str {
        PROMETHEUS_CONTENT_TYPE
    }

    fn format(&self, snapshot: &Snapshot) -> String {
        let mut output = String::new();
        let last = snapshot.last.as_ref();

        self.write_metric(&mut output, "gauge", "server_id", "Speedtest server ID used to test",
            last.map(|m| m.server_id as f64).unwrap_or(0.0));
        self.write_metric(&mut output, "gauge", "jitter_latency_milliseconds", "Speedtest current Jitter in ms",
            last.map(|m| m.jitter_ms).unwrap_or(0.0));
        self.write_metric(&mut output, "gauge", "ping_latency_milliseconds", "Speedtest current Ping in ms",
            last.map(|m| m.ping_ms).unwrap_or(0.0));
        self.write_metric(&mut output, "gauge", "download_bits_per_second", "Speedtest current Download Speed in bit/s",
            last.map(|m| m.download_bps).unwrap_or(0.0));
        self.write_metric(&mut output, "gauge", "upload_bits_per_second", "Speedtest current Upload speed in bits/s",
            last.map(|m| m.upload_bps).unwrap_or(0.0));
        self.write_metric(&mut output, "gauge", "up", "Speedtest status whether the scrape worked",
            snapshot.up() as f64);

        if let Some(packet_loss) = last.and_then(|m| m.packet_loss) {
            self.write_metric(&mut output, "gauge", "packet_loss_percent", "Speedtest packet loss in percent",
                packet_loss);
        }

        if let Some(measurement) = last {
            self.write_metric(&mut output, "gauge", "last_run_timestamp_seconds",
                "Unix time the last speedtest run completed",
                measurement.timestamp.timestamp_millis() as f64 / 1000.0);
            self.write_metric(&mut output, "gauge", "run_duration_seconds",
                "Duration of the last speedtest run in seconds",
                measurement.duration.as_secs_f64());
        }

        self.write_metric(&mut output, "counter", "runs_total", "Total speedtest runs started",
            snapshot.runs_total as f64);
        self.write_metric(&mut output, "counter", "failures_total", "Total speedtest runs that produced no result",
            snapshot.failures_total as f64);
        self.write_metric_with_labels(&mut output, "gauge", "exporter_build_info",
            "Speedtest exporter build information", 1.0,
            &[("version", &self.version), ("commit", crate::GIT_COMMIT.unwrap_or("unknown"))]);

        output
    }
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "+Inf".to_string() } else { "-Inf".to_string() }
    } else {
        value.to_string()
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measurement;
    use crate::types::RunStatus;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn measured() -> Snapshot {
        Snapshot {
            last: Some(Measurement {
                server_id: 21541,
                server_name: Some("Example Fiber".to_string()),
                isp: None,
                jitter_ms: 0.512,
                ping_ms: 4.21,
                download_bps: 98_765_424.0,
                upload_bps: 20_000_000.0,
                packet_loss: Some(0.25),
                result_url: None,
                timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
                duration: Duration::from_millis(21_500),
                status: RunStatus::Success,
                error: None,
            }),
            runs_total: 3,
            failures_total: 1,
            running: false,
        }
    }

    #[test]
    fn test_successful_snapshot() {
        let output = PrometheusFormatter::new().format(&measured());

        assert!(output.contains("# HELP speedtest_server_id Speedtest server ID used to test\n"));
        assert!(output.contains("# TYPE speedtest_server_id gauge\n"));
        assert!(output.contains("speedtest_server_id 21541\n"));
        assert!(output.contains("speedtest_jitter_latency_milliseconds 0.512\n"));
        assert!(output.contains("speedtest_ping_latency_milliseconds 4.21\n"));
        assert!(output.contains("speedtest_download_bits_per_second 98765424\n"));
        assert!(output.contains("speedtest_upload_bits_per_second 20000000\n"));
        assert!(output.contains("speedtest_up 1\n"));
        assert!(output.contains("speedtest_packet_loss_percent 0.25\n"));
        assert!(output.contains("speedtest_last_run_timestamp_seconds 1714566600\n"));
        assert!(output.contains("speedtest_run_duration_seconds 21.5\n"));
        assert!(output.contains("# TYPE speedtest_runs_total counter\n"));
        assert!(output.contains("speedtest_runs_total 3\n"));
        assert!(output.contains("speedtest_failures_total 1\n"));
    }

    #[test]
    fn test_empty_snapshot_reports_down() {
        let output = PrometheusFormatter::new().format(&Snapshot::empty());

        assert!(output.contains("speedtest_up 0\n"));
        assert!(output.contains("speedtest_server_id 0\n"));
        assert!(output.contains("speedtest_download_bits_per_second 0\n"));
        assert!(!output.contains("speedtest_packet_loss_percent"));
        assert!(!output.contains("speedtest_last_run_timestamp_seconds"));
    }

    #[test]
    fn test_failed_snapshot_reports_down() {
        let snapshot = Snapshot {
            last: Some(Measurement::failed("exit 2".to_string(), Duration::from_secs(2))),
            runs_total: 1,
            failures_total: 1,
            running: false,
        };
        let output = PrometheusFormatter::new().format(&snapshot);

        assert!(output.contains("speedtest_up 0\n"));
        assert!(output.contains("speedtest_ping_latency_milliseconds 0\n"));
        assert!(output.contains("speedtest_run_duration_seconds 2\n"));
    }

    #[test]
    fn test_build_info_labels() {
        let output = PrometheusFormatter::new().format(&Snapshot::empty());
        let line = output
            .lines()
            .find(|l| l.starts_with("speedtest_exporter_build_info{"))
            .unwrap();
        assert!(line.contains(&format!("version=\"{}\"", crate::VERSION)));
        assert!(line.ends_with(" 1"));
    }

    #[test]
    fn test_every_sample_has_help_and_type() {
        let output = PrometheusFormatter::new().format(&measured());
        let samples: Vec<&str> = output.lines().filter(|l| !l.starts_with('#')).collect();
        let helps = output.lines().filter(|l| l.starts_with("# HELP")).count();
        let types = output.lines().filter(|l| l.starts_with("# TYPE")).count();
        assert_eq!(samples.len(), helps);
        assert_eq!(samples.len(), types);
    }

    #[test]
    fn test_custom_namespace() {
        let output = PrometheusFormatter::with_namespace("isp").format(&Snapshot::empty());
        assert!(output.contains("isp_up 0"));
        assert!(!output.contains("speedtest_"));
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(1.5), "1.5");
    }

    #[test]
    fn test_label_escaping() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
