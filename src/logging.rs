//! Structured logging for the speedtest exporter
//!
//! Log entries are built with a small builder API, carry structured fields and
//! an optional correlation id, and are rendered in one of three formats:
//! - `logfmt` (default): `level=INFO datetime=... logger=... message key=value`
//! - `json`: one JSON object per line for log aggregators
//! - `console`: coloured, human-oriented output for local runs

use crate::error::{AppError, Result};
use crate::models::{Config, Measurement};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Trace level - most detailed
    Trace = 0,
    /// Debug level - detailed information for debugging
    Debug = 1,
    /// Info level - general application information
    Info = 2,
    /// Warning level - potentially harmful situations
    Warn = 3,
    /// Error level - error events but application can continue
    Error = 4,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn colorize(&self, text: &str) -> String {
        use colored::Colorize;
        match self {
            LogLevel::Trace => text.white().to_string(),
            LogLevel::Debug => text.cyan().to_string(),
            LogLevel::Info => text.green().to_string(),
            LogLevel::Warn => text.yellow().to_string(),
            LogLevel::Error => text.red().bold().to_string(),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(AppError::config(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `key=value` lines
    Logfmt,
    /// JSON format for structured logging
    Json,
    /// Human-readable console format
    Console,
}

impl std::str::FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "logfmt" => Ok(LogFormat::Logfmt),
            "json" => Ok(LogFormat::Json),
            "console" | "pretty" => Ok(LogFormat::Console),
            _ => Err(AppError::config(format!("Invalid log format: {} (expected logfmt, json or console)", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Log message
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Additional structured fields
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, serde_json::Value>,
}

/// Shared logging context
#[derive(Debug, Default)]
struct LogContext {
    /// Fields attached to every entry
    context_fields: BTreeMap<String, serde_json::Value>,
}

/// Logger implementation with multiple output formats
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    format: LogFormat,
    use_color: bool,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            min_level: LogLevel::Info,
            format: LogFormat::Logfmt,
            use_color: false,
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: impl Into<String>, config: &Config) -> Result<Self> {
        let min_level = if config.debug {
            LogLevel::Debug
        } else {
            config.log_level()?
        };
        let format = config.log_format()?;

        Ok(Self {
            min_level,
            format,
            use_color: format == LogFormat::Console,
            name: name.into(),
            context: Arc::new(RwLock::new(LogContext::default())),
        })
    }

    /// Create a logger for a sub-component sharing level, format and context
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Set minimum log level
    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Generate a correlation id for one operation
    pub fn new_correlation_id() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        {
            let context = self.context.read().await;
            for (key, value) in &context.context_fields {
                entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        let output = self.render(&entry);

        // Write to stderr for errors/warnings, stdout for others
        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    /// Render an entry in the configured format
    pub fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Logfmt => format_logfmt(entry),
            LogFormat::Json => format_json(entry),
            LogFormat::Console => self.format_console(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color { entry.level.colorize(&level) } else { level };

        let mut output = format!("{} {} [{}] {}", timestamp, level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            output.push_str(&format!(" [{}]", correlation_id));
        }

        if !entry.fields.is_empty() {
            let fields: Vec<String> = entry.fields.iter()
                .map(|(k, v)| format!("{}={}", k, render_value(v)))
                .collect();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }
}

fn format_logfmt(entry: &LogEntry) -> String {
    let mut output = format!(
        "level={} datetime={} logger={} {}",
        entry.level.as_str(),
        entry.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        entry.logger,
        entry.message,
    );

    if let Some(correlation_id) = &entry.correlation_id {
        output.push_str(&format!(" run_id={}", correlation_id));
    }

    for (key, value) in &entry.fields {
        output.push_str(&format!(" {}={}", key, quote_logfmt(&render_value(value))));
    }

    output
}

fn format_json(entry: &LogEntry) -> String {
    match serde_json::to_string(entry) {
        Ok(json) => json,
        Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}", entry.message),
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quote_logfmt(value: &str) -> String {
    if value.is_empty() || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '=') {
        format!("{:?}", value)
    } else {
        value.to_string()
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
            },
        }
    }

    /// Add a correlation ID
    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add the values of a completed measurement
    pub fn measurement(self, measurement: &Measurement) -> Self {
        self.field("server_id", measurement.server_id)
            .field("jitter_ms", measurement.jitter_ms)
            .field("ping_ms", measurement.ping_ms)
            .field("download_bps", measurement.download_bps)
            .field("upload_bps", measurement.upload_bps)
            .field("duration_ms", measurement.duration.as_millis() as u64)
            .field("status", measurement.status.as_str())
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Take the built entry without writing it
    pub fn build(self) -> LogEntry {
        self.entry
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_entry(logger: &Logger) -> LogEntry {
        let mut entry = logger.info("Starting Speedtest-Exporter on http://0.0.0.0:9798")
            .field("mode", "on every scrape")
            .field("port", 9798)
            .build();
        entry.timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        entry
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("info".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("logfmt".parse::<LogFormat>().unwrap(), LogFormat::Logfmt);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Console);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_level_filtering() {
        let mut logger = Logger::new("test");
        logger.set_level(LogLevel::Warn);
        assert!(!logger.would_log(LogLevel::Info));
        assert!(logger.would_log(LogLevel::Warn));
        assert!(logger.would_log(LogLevel::Error));
    }

    #[test]
    fn test_logfmt_rendering() {
        let logger = Logger::new("app");
        let line = logger.render(&fixed_entry(&logger));
        assert_eq!(
            line,
            "level=INFO datetime=2024-05-01T12:30:00.000Z logger=app Starting Speedtest-Exporter on http://0.0.0.0:9798 mode=\"on every scrape\" port=9798"
        );
    }

    #[test]
    fn test_json_rendering() {
        let config = Config {
            log_format: "json".to_string(),
            ..Config::default()
        };
        let logger = Logger::with_config("app", &config).unwrap();
        let line = logger.render(&fixed_entry(&logger));
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "Info");
        assert_eq!(value["logger"], "app");
        assert_eq!(value["fields"]["port"], 9798);
    }

    #[test]
    fn test_child_logger_shares_settings() {
        let mut parent = Logger::new("app");
        parent.set_level(LogLevel::Error);
        let child = parent.child("poller");
        assert_eq!(child.name(), "poller");
        assert!(!child.would_log(LogLevel::Warn));
    }

    #[test]
    fn test_correlation_id_shape() {
        let id = Logger::new_correlation_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_logfmt_quotes_values_with_spaces() {
        assert_eq!(quote_logfmt("plain"), "plain");
        assert_eq!(quote_logfmt("two words"), "\"two words\"");
        assert_eq!(quote_logfmt(""), "\"\"");
    }

    #[tokio::test]
    async fn test_context_fields_are_shared_with_children() {
        let logger = Logger::new("app");
        let child = logger.child("server");
        logger.add_context_field("instance", "exporter-1").await;

        let context = child.context.read().await;
        assert_eq!(context.context_fields["instance"], "exporter-1");
    }
}
