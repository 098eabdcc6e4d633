//! Running the external speedtest CLI
//!
//! The measurement itself is done by the official Ookla CLI. This module
//! spawns it, bounds it with a timeout, and turns its JSON report into a
//! [`Measurement`].

pub mod binary;
pub mod report;

pub use binary::{verify_binary, BinaryInfo};
pub use report::parse_report;

use crate::error::{AppError, Result};
use crate::models::{Config, Measurement};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// Something that can perform one speed measurement
#[async_trait]
pub trait SpeedtestRunner: Send + Sync {
    /// Run a single measurement
    async fn run(&self) -> Result<Measurement>;

    /// Short description used in logs
    fn describe(&self) -> String {
        "speedtest".to_string()
    }
}

/// Runs the Ookla `speedtest` binary
#[derive(Debug, Clone)]
pub struct CliRunner {
    binary: String,
    server_id: Option<String>,
    timeout: Duration,
}

impl CliRunner {
    /// Create a runner for the given binary and timeout
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            server_id: None,
            timeout,
        }
    }

    /// Build a runner from the application configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.binary.clone(), config.timeout()).with_server_id(config.server_id.clone())
    }

    /// Pin tests to a specific server
    pub fn with_server_id(mut self, server_id: Option<String>) -> Self {
        self.server_id = server_id;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Arguments passed to the CLI
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--format=json-pretty".to_string(),
            "--progress=no".to_string(),
            "--accept-license".to_string(),
            "--accept-gdpr".to_string(),
        ];
        if let Some(server_id) = &self.server_id {
            args.push(format!("--server-id={}", server_id));
        }
        args
    }
}

#[async_trait]
impl SpeedtestRunner for CliRunner {
    async fn run(&self) -> Result<Measurement> {
        let start = Instant::now();

        let child = Command::new(&self.binary)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| AppError::process(format!("Failed to wait for speedtest: {}", e)))?,
            Err(_) => {
                return Err(AppError::timeout(format!(
                    "Speedtest CLI process timeout after {}s",
                    self.timeout.as_secs_f64()
                )))
            }
        };

        if !output.status.success() {
            let detail = report::error_message(&output.stdout)
                .unwrap_or_else(|| String::from_utf8_lossy(&output.stderr).trim().to_string());
            let code = output.status.code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(AppError::process(format!("Speedtest CLI exited with status {}: {}", code, detail)));
        }

        let mut measurement = parse_report(&output.stdout)?;
        measurement.duration = start.elapsed();
        Ok(measurement)
    }

    fn describe(&self) -> String {
        match &self.server_id {
            Some(id) => format!("{} (server {})", self.binary, id),
            None => self.binary.clone(),
        }
    }
}

pub(crate) fn spawn_error(binary: &str, error: std::io::Error) -> AppError {
    if error.kind() == std::io::ErrorKind::NotFound {
        AppError::process(format!(
            "Speedtest CLI binary '{}' not found. Please install it from {}",
            binary,
            crate::defaults::CLI_DOWNLOAD_URL
        ))
    } else {
        AppError::process(format!("Failed to start speedtest CLI '{}': {}", binary, error))
    }
}
