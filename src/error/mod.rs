//! Error handling for the speedtest exporter

use thiserror::Error;

/// Custom error types for the speedtest exporter
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (speedtest output, URLs, numbers)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// The speedtest CLI could not be started or reported a failure
    #[error("Speedtest process error: {0}")]
    Process(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// HTTP responder errors (bind, serve)
    #[error("Server error: {0}")]
    Server(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new speedtest process error
    pub fn process<S: Into<String>>(message: S) -> Self {
        Self::Process(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new server error
    pub fn server<S: Into<String>>(message: S) -> Self {
        Self::Server(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Validation(_) => "VALIDATION",
            Self::Parse(_) => "PARSE",
            Self::Process(_) => "PROCESS",
            Self::Timeout(_) => "TIMEOUT",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Io(_) => "IO",
            Self::Server(_) => "SERVER",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is transient (the next run may succeed)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Process(_) | Self::Timeout(_) | Self::Network(_) | Self::HttpRequest(_) | Self::Parse(_) => true,
            Self::Config(_) | Self::Validation(_) => false,
            Self::Io(_) | Self::Server(_) | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::HttpRequest(_) => 2,  // Network issues
            Self::Timeout(_) => 3,
            Self::Process(_) => 4,  // Speedtest CLI issues
            Self::Io(_) | Self::Server(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::HttpRequest(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Process(_) => {
                    format!("[{}] {}", category.magenta().bold(), message.magenta())
                }
                Self::Io(_) | Self::Server(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<url::ParseError> for AppError {
    fn from(error: url::ParseError) -> Self {
        Self::parse(format!("URL parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::timeout(error.to_string())
        } else if error.is_connect() || error.is_request() {
            Self::network(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
    }
}

impl From<dotenv::Error> for AppError {
    fn from(error: dotenv::Error) -> Self {
        Self::config(format!("Environment file error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::parse(format!("Integer parse error: {}", error))
    }
}

impl From<std::str::ParseBoolError> for AppError {
    fn from(error: std::str::ParseBoolError) -> Self {
        Self::parse(format!("Boolean parse error: {}", error))
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::parse(format!("IP address parse error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error context trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error
    fn context(self, message: &'static str) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<AppError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            let context = f();
            match base_error {
                AppError::Config(msg) => AppError::config(format!("{}: {}", context, msg)),
                AppError::Validation(msg) => AppError::validation(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::parse(format!("{}: {}", context, msg)),
                AppError::Process(msg) => AppError::process(format!("{}: {}", context, msg)),
                AppError::Timeout(msg) => AppError::timeout(format!("{}: {}", context, msg)),
                AppError::Network(msg) => AppError::network(format!("{}: {}", context, msg)),
                AppError::HttpRequest(msg) => AppError::http_request(format!("{}: {}", context, msg)),
                AppError::Io(msg) => AppError::io(format!("{}: {}", context, msg)),
                AppError::Server(msg) => AppError::server(format!("{}: {}", context, msg)),
                AppError::Internal(msg) => AppError::internal(format!("{}: {}", context, msg)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}
