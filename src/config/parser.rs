//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file()?;
        self.parse_without_env_file()
    }

    /// Build the configuration from defaults, process environment and CLI
    pub fn parse_without_env_file(&self) -> Result<Config> {
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            if let Ok(value) = std::env::var(name) {
                if !value.trim().is_empty() {
                    EnvManager::validate_env_var(name, &value)?;
                }
            }
        }

        let mut config = Config::default();
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    pub fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(port) = self.cli.port {
            config.port = port;
        }

        if let Some(ref address) = self.cli.listen_address {
            config.listen_address = address.clone();
        }

        if let Some(ref server_id) = self.cli.server_id {
            config.server_id = Some(server_id.clone());
        }

        if let Some(timeout) = self.cli.timeout {
            config.timeout_seconds = timeout;
        }

        if let Some(cache_for) = self.cli.cache_for {
            config.cache_for_seconds = cache_for;
        }

        if let Some(interval) = self.cli.interval {
            config.interval_seconds = interval;
        }

        if let Some(ref binary) = self.cli.binary {
            config.binary = binary.clone();
        }

        if self.cli.require_binary {
            config.require_binary = true;
        }

        if let Some(ref level) = self.cli.log_level {
            config.log_level = level.clone();
        }

        if let Some(ref format) = self.cli.log_format {
            config.log_format = format.clone();
        }

        config.debug = self.cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Listen: {}:{}", config.listen_address, config.port));
    summary.push(format!("Server: {}", config.server_id.as_deref().unwrap_or("auto")));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Refresh: {}", config.refresh_mode().describe()));
    summary.push(format!("Binary: {}", config.binary));
    summary.push(format!("Require binary: {}", config.require_binary));
    summary.push(format!("Log: {} ({})", config.log_level, config.log_format));

    summary.join("\n")
}
