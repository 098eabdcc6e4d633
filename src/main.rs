//! Speedtest Exporter - Main CLI Application
//!
//! Runs the official Ookla speedtest CLI and serves its results as
//! Prometheus metrics.

use clap::Parser;
use speedtest_exporter::{
    app::App,
    cli::Cli,
    defaults::CLI_DOWNLOAD_URL,
    error::AppError,
};
use std::{error::Error, io::IsTerminal, process};

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    // Parse command line arguments
    let cli = Cli::parse();

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.format_for_console(std::io::stderr().is_terminal()));

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        // Print suggestions for common errors
        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - SPEEDTEST_PORT, SPEEDTEST_TIMEOUT, SPEEDTEST_CACHE_FOR and SPEEDTEST_INTERVAL take whole numbers");
            eprintln!("  - SPEEDTEST_SERVER must be a numeric Ookla server id");
            eprintln!("  - Run with --help to list every option");
        }
        AppError::Validation(_) | AppError::Process(_) => {
            eprintln!();
            eprintln!("Speedtest CLI help:");
            eprintln!("  - Install the official CLI from {}", CLI_DOWNLOAD_URL);
            eprintln!("  - Point SPEEDTEST_BINARY at it if it is not on PATH");
            eprintln!("  - Run 'speedtest --accept-license --accept-gdpr' once by hand to check it works");
        }
        AppError::Network(_) | AppError::HttpRequest(_) => {
            eprintln!();
            eprintln!("Healthcheck troubleshooting:");
            eprintln!("  - Is the exporter running on this host?");
            eprintln!("  - Does --port (SPEEDTEST_PORT) match the running exporter?");
        }
        AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Timeout troubleshooting:");
            eprintln!("  - Increase SPEEDTEST_TIMEOUT (or --timeout)");
            eprintln!("  - Pin a nearby server with SPEEDTEST_SERVER");
        }
        AppError::Server(_) => {
            eprintln!();
            eprintln!("Server troubleshooting:");
            eprintln!("  - Check that nothing else listens on the configured port");
            eprintln!("  - Ports below 1024 need elevated permissions");
        }
        _ => {}
    }
}
