//! Error handling for the edge IP tester
//!
//! Only configuration-type errors ever halt a run. Probe and stream errors
//! exist so that workers can describe a failed attempt to the logger before
//! folding it into a "no signal" outcome.

use thiserror::Error;

/// Custom error types for the edge IP tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (bad option values, unreadable input, unwritable output)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Parsing errors (IP ranges, URLs, numbers, JSON)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Network connectivity errors (dial refused, unreachable)
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP request errors
    #[error("HTTP request error: {0}")]
    HttpRequest(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Probe rejected the candidate (status or edge-location mismatch)
    #[error("Probe rejected: {0}")]
    Probe(String),

    /// Download stream ended early or failed mid-read
    #[error("Stream error: {0}")]
    Stream(String),

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

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new HTTP request error
    pub fn http_request<S: Into<String>>(message: S) -> Self {
        Self::HttpRequest(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new probe rejection
    pub fn probe<S: Into<String>>(message: S) -> Self {
        Self::Probe(message.into())
    }

    /// Create a new stream error
    pub fn stream<S: Into<String>>(message: S) -> Self {
        Self::Stream(message.into())
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
            Self::Io(_) => "IO",
            Self::Network(_) => "NETWORK",
            Self::HttpRequest(_) => "HTTP",
            Self::Timeout(_) => "TIMEOUT",
            Self::Probe(_) => "PROBE",
            Self::Stream(_) => "STREAM",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable, i.e. degrades into "no signal" for one candidate
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::HttpRequest(_) | Self::Timeout(_) | Self::Probe(_) | Self::Stream(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) | Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// One-line hint naming the option or input most likely at fault
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Config(_) => "check .env, the environment and the command line; `eit --check-env` lists bad values",
            Self::Validation(_) => "see `eit --help-topic filters` for the accepted ranges",
            Self::Parse(_) => "ranges are a bare address (1.1.1.1) or CIDR (1.1.1.0/24, 2606:4700::/32)",
            Self::Io(_) => "check the -f input and -o output paths",
            Self::Network(_) | Self::Timeout(_) => "the address or the test URL is unreachable from here",
            Self::HttpRequest(_) | Self::Stream(_) => "try another --url, or --disable-download for latency only",
            Self::Probe(_) => "relax --httping-code or --cfcolo",
            Self::Internal(_) => "this is a bug; rerun with --debug and report the output",
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,  // Invalid configuration/usage
            Self::Network(_) | Self::HttpRequest(_) | Self::Probe(_) => 2,
            Self::Timeout(_) | Self::Stream(_) => 3,
            Self::Io(_) => 5,
            Self::Internal(_) => 99,
        }
    }

    /// `[CATEGORY] message`, colored by exit-code class
    pub fn format_for_console(&self, use_color: bool) -> String {
        let line = format!("[{}] {}", self.category(), self);
        if !use_color {
            return line;
        }

        use colored::Colorize;
        match self.exit_code() {
            1 => line.red().to_string(),
            2 => line.yellow().to_string(),
            3 => line.blue().to_string(),
            5 => line.cyan().to_string(),
            _ => line.bright_red().bold().to_string(),
        }
    }
}

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
        } else if error.is_body() || error.is_decode() {
            Self::stream(error.to_string())
        } else {
            Self::http_request(error.to_string())
        }
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
    /// Keeps the original category so that exit codes survive the extra context
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let original_error = e.into();
            let context = f();
            match original_error {
                AppError::Config(msg) => AppError::Config(format!("{}: {}", context, msg)),
                AppError::Validation(msg) => AppError::Validation(format!("{}: {}", context, msg)),
                AppError::Parse(msg) => AppError::Parse(format!("{}: {}", context, msg)),
                AppError::Io(msg) => AppError::Io(format!("{}: {}", context, msg)),
                other => AppError::internal(format!("{}: {}", context, other)),
            }
        })
    }

    fn context(self, message: &'static str) -> Result<T> {
        self.with_context(|| message.to_string())
    }
}

/// Prints a failed run to stderr
pub struct ErrorReporter {
    use_color: bool,
    verbose: bool,
}

impl ErrorReporter {
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Verbose runs also get the hint line
    pub fn render(&self, error: &AppError) -> String {
        let mut out = error.format_for_console(self.use_color);
        if self.verbose {
            out.push_str(&format!("\n  hint: {}", error.hint()));
        }
        out
    }

    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}
