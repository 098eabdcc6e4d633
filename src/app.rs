//! Main application orchestration and execution

use crate::{
    cli::{Cli, Command},
    config::{display_config_summary, load_config, validate_config, ValidationLevel},
    error::{AppError, Result},
    healthcheck,
    logging::{LogLevel, Logger},
    models::Config,
    output::{OutputFormat, OutputFormatterFactory},
    poller::Poller,
    server::{shutdown_signal, MetricsServer},
    speedtest::{binary::verify_binary, CliRunner},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::config)?;
        Ok(Self { cli })
    }

    /// Run the selected command
    pub async fn run(self) -> Result<()> {
        let command = self.cli.command();
        let config = load_config(self.cli)?;

        match command {
            Command::Serve => serve(config).await,
            Command::Probe { json } => probe(config, json).await,
            Command::Healthcheck { path, wait } => {
                run_healthcheck(&config, &path, Duration::from_secs(wait)).await
            }
        }
    }
}

/// Run the exporter until SIGINT or SIGTERM
pub async fn serve(config: Config) -> Result<()> {
    let logger = Logger::with_config(crate::PKG_NAME, &config)?;

    for warning in validate_config(&config)? {
        let builder = match warning.level {
            ValidationLevel::Info => logger.info(&warning.message),
            ValidationLevel::Warning => logger.warn(&warning.message),
            ValidationLevel::Error => logger.error(&warning.message),
        };
        builder.log().await;
    }

    if config.debug {
        for line in display_config_summary(&config).lines() {
            logger.debug(line).log().await;
        }
    }

    check_binary(&config, &logger).await?;

    let runner = CliRunner::from_config(&config);
    let poller = Poller::new(Arc::new(runner), config.refresh_mode(), logger.child("poller"));

    let server = MetricsServer::bind(config.socket_addr()?, poller.clone(), logger.child("http")).await?;
    let addr = server.local_addr()?;
    logger.add_context_field("instance", addr.to_string()).await;

    logger.info(&format!("Starting Speedtest-Exporter on http://{}", addr))
        .field("version", crate::VERSION)
        .field("target", crate::TARGET_TRIPLE.unwrap_or("unknown"))
        .field("mode", config.refresh_mode().describe())
        .field("timeout_s", config.timeout_seconds)
        .log()
        .await;

    let (stop_tx, stop_rx) = watch::channel(false);
    let interval = poller.spawn_interval(stop_rx);

    let result = server.serve(shutdown_signal()).await;

    // The interval task may already be gone
    let _ = stop_tx.send(true);
    if let Some(handle) = interval {
        if let Err(e) = handle.await {
            logger.warn(&format!("Interval task ended abnormally: {}", e)).log().await;
        }
    }

    logger.info("Speedtest-Exporter stopped").log().await;
    result
}

/// Verify the installed CLI; fatal only when `require_binary` is set
async fn check_binary(config: &Config, logger: &Logger) -> Result<()> {
    match verify_binary(&config.binary).await {
        Ok(info) => {
            logger.info("Found speedtest CLI")
                .field("binary", &info.binary)
                .field("cli_version", &info.version)
                .log()
                .await;
            Ok(())
        }
        Err(e) if config.require_binary => Err(e),
        Err(e) => {
            logger.warn(&e.to_string())
                .error_info(&e)
                .field("hint", "scrapes will report speedtest_up 0 until the CLI is usable")
                .log()
                .await;
            Ok(())
        }
    }
}

/// Run a single speedtest and print the result to stdout
pub async fn probe(config: Config, json: bool) -> Result<()> {
    let mut logger = Logger::with_config(crate::PKG_NAME, &config)?;
    if !config.debug {
        // Keep stdout for the metrics
        logger.set_level(LogLevel::Warn);
    }

    let runner = CliRunner::from_config(&config);
    let poller = Poller::new(
        Arc::new(runner),
        crate::types::RefreshMode::OnScrape { cache_for: Duration::ZERO },
        logger,
    );
    let snapshot = poller.scrape().await;

    let format = if json { OutputFormat::Json } else { OutputFormat::Prometheus };
    let formatter = OutputFormatterFactory::create(format);
    print!("{}", formatter.format(&snapshot));
    if json {
        println!();
    }

    match snapshot.last {
        Some(measurement) if measurement.is_successful() => Ok(()),
        Some(measurement) => Err(match measurement.status {
            crate::types::RunStatus::Timeout => AppError::timeout(measurement.error.unwrap_or_default()),
            _ => AppError::process(measurement.error.unwrap_or_default()),
        }),
        None => Err(AppError::internal("Speedtest did not run")),
    }
}

/// Probe the local responder; used as the container HEALTHCHECK
pub async fn run_healthcheck(config: &Config, path: &str, wait: Duration) -> Result<()> {
    let url = healthcheck::local_url(config.socket_addr()?, path)?;
    healthcheck::check(&url, wait).await?;
    if config.debug {
        println!("OK {}", url);
    }
    Ok(())
}
