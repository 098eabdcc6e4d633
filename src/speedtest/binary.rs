//! Checking that the official speedtest CLI is installed

use crate::defaults::{CLI_DOWNLOAD_URL, OFFICIAL_CLI_MARKER};
use crate::error::{AppError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity of the installed CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInfo {
    pub binary: String,
    /// First line of `--version` output
    pub version: String,
}

/// Run `<binary> --version` and require the official Ookla CLI
pub async fn verify_binary(binary: &str) -> Result<BinaryInfo> {
    let child = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| super::spawn_error(binary, e))?;

    let output = tokio::time::timeout(VERSION_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| AppError::timeout(format!("'{} --version' did not finish", binary)))?
        .map_err(|e| AppError::process(format!("Failed to run '{} --version': {}", binary, e)))?;

    check_version_output(binary, &String::from_utf8_lossy(&output.stdout))
}

/// Validate `--version` output
pub fn check_version_output(binary: &str, output: &str) -> Result<BinaryInfo> {
    if !output.contains(OFFICIAL_CLI_MARKER) {
        return Err(AppError::validation(format!(
            "Unofficial speedtest CLI detected at '{}'. Please install the official CLI from {}",
            binary, CLI_DOWNLOAD_URL
        )));
    }

    let version = output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string();

    Ok(BinaryInfo {
        binary: binary.to_string(),
        version,
    })
}
