//! Structured logging for the edge IP tester
//!
//! Entries carry a session id and arbitrary serde fields and can be rendered
//! as human-readable console lines, JSON objects or compact one-liners.
//! Warnings and above go to stderr so that ranked output on stdout stays clean.

use crate::error::{AppError, Result};
use crate::models::{Config, ProbeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Level implied by the run configuration
    pub fn from_config(config: &Config) -> Self {
        if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }

    fn paint(&self, text: &str) -> String {
        use colored::Colorize;
        match self {
            LogLevel::Trace => text.white().to_string(),
            LogLevel::Debug => text.cyan().to_string(),
            LogLevel::Info => text.green().to_string(),
            LogLevel::Warn => text.yellow().to_string(),
            LogLevel::Error => text.red().to_string(),
            LogLevel::Fatal => text.magenta().bold().to_string(),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// One structured log record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Component that emitted the entry
    pub logger: String,
    pub fields: HashMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// JSON format for structured logging
    Json,
    /// Compact single-line format
    Compact,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Cloneable logger; clones share the session context
#[derive(Clone)]
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Debug runs get JSON output with source locations
    pub fn with_config(name: String, config: &Config) -> Self {
        Self {
            min_level: LogLevel::from_config(config),
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add a field to every subsequent entry
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

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

    pub fn fatal(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Fatal, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        let output = self.render(&entry);

        if entry.level >= LogLevel::Warn {
            let _ = writeln!(io::stderr(), "{}", output);
        } else {
            let _ = writeln!(io::stdout(), "{}", output);
        }
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color { entry.level.paint(&level) } else { level };

        let mut output = format!("{} {} [{}] {}", timestamp, level, entry.logger, entry.message);

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry
                .fields
                .iter()
                .filter(|(k, _)| k.as_str() != "session_id")
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            fields.sort();
            if !fields.is_empty() {
                output.push_str(&format!(" {{{}}}", fields.join(", ")));
            }
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!("{{\"error\": \"Failed to serialize log entry\", \"message\": \"{}\"}}", entry.message),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder for one log entry
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
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Attach the aggregate numbers of a probe
    pub fn probe(self, result: &ProbeResult) -> Self {
        self.field("address", result.address)
            .field("sent", result.sent)
            .field("received", result.received)
            .field("loss_rate", result.loss_rate())
            .field("mean_delay_ms", result.mean_delay_ms())
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Times the pipeline phases
pub struct PhaseLogger {
    logger: Logger,
    started: HashMap<String, Instant>,
}

impl PhaseLogger {
    pub fn new(config: &Config) -> Self {
        Self::from_logger(Logger::with_config("PHASE".to_string(), config))
    }

    fn from_logger(logger: Logger) -> Self {
        Self {
            logger,
            started: HashMap::new(),
        }
    }

    pub async fn start(&mut self, phase: &str, items: usize) {
        self.started.insert(phase.to_string(), Instant::now());
        self.logger
            .info(&format!("Starting {} ({} items)", phase, items))
            .field("phase", phase)
            .field("items", items)
            .log()
            .await;
    }

    /// Returns the phase duration, `None` for a phase that was never started
    pub async fn finish(&mut self, phase: &str, kept: usize) -> Option<Duration> {
        let Some(started) = self.started.remove(phase) else {
            self.logger
                .warn(&format!("Finished unknown phase: {}", phase))
                .field("phase", phase)
                .log()
                .await;
            return None;
        };

        let elapsed = started.elapsed();
        self.logger
            .info(&format!("Finished {} in {:.3}s, {} kept", phase, elapsed.as_secs_f64(), kept))
            .field("phase", phase)
            .field("kept", kept)
            .field("duration_ms", elapsed.as_secs_f64() * 1000.0)
            .log()
            .await;

        Some(elapsed)
    }
}

/// Per-candidate probe and download events
#[derive(Clone)]
pub struct ProbeLogger {
    logger: Logger,
}

impl ProbeLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("PROBE".to_string(), config),
        }
    }

    /// A single failed attempt, folded into the loss count by the caller
    pub async fn attempt_failed(&self, address: IpAddr, attempt: u32, error: &AppError) {
        self.logger
            .debug(&format!("Attempt {} on {} failed: {}", attempt, address, error))
            .field("address", address)
            .field("attempt", attempt)
            .error_info(error)
            .log()
            .await;
    }

    /// HTTP validation request turned the candidate away
    pub async fn rejected(&self, address: IpAddr, error: &AppError) {
        self.logger
            .debug(&format!("{} rejected: {}", address, error))
            .field("address", address)
            .error_info(error)
            .log()
            .await;
    }

    pub async fn probed(&self, result: &ProbeResult) {
        self.logger
            .trace(&format!("Probed {}", result.address))
            .probe(result)
            .log()
            .await;
    }

    pub async fn download_measured(&self, address: IpAddr, bytes_per_sec: f64, qualified: bool) {
        self.logger
            .info(&format!(
                "Download from {}: {:.2} MB/s{}",
                address,
                bytes_per_sec / 1024.0 / 1024.0,
                if qualified { "" } else { " (below floor)" }
            ))
            .field("address", address)
            .field("bytes_per_sec", bytes_per_sec)
            .field("qualified", qualified)
            .log()
            .await;
    }
}

/// Error event logger
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ERR".to_string(), config),
        }
    }

    pub async fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log().await;
    }
}

/// Hands out loggers that share one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_phase_logger(&self) -> PhaseLogger {
        PhaseLogger::from_logger(self.create_logger("PHASE").await)
    }

    pub async fn create_probe_logger(&self) -> ProbeLogger {
        ProbeLogger {
            logger: self.create_logger("PROBE").await,
        }
    }

    pub async fn create_error_logger(&self) -> ErrorEventLogger {
        ErrorEventLogger {
            logger: self.create_logger("ERR").await,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn entry(level: LogLevel) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level,
            message: "Probed 1.1.1.1".to_string(),
            logger: "PROBE".to_string(),
            fields: {
                let mut map = HashMap::new();
                map.insert("received".to_string(), serde_json::json!(4));
                map
            },
            location: None,
        }
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_level_from_config() {
        let mut config = Config::default();
        assert_eq!(LogLevel::from_config(&config), LogLevel::Warn);
        config.verbose = true;
        assert_eq!(LogLevel::from_config(&config), LogLevel::Info);
        config.debug = true;
        assert_eq!(LogLevel::from_config(&config), LogLevel::Debug);
    }

    #[test]
    fn test_logger_with_debug_config() {
        let config = Config {
            debug: true,
            enable_color: false,
            ..Default::default()
        };

        let logger = Logger::with_config("TEST".to_string(), &config);
        assert_eq!(logger.min_level, LogLevel::Debug);
        assert_eq!(logger.format, LogFormat::Json);
        assert!(!logger.use_color);
        assert!(logger.include_location);
    }

    #[test]
    fn test_would_log() {
        let mut logger = Logger::new("TEST".to_string());
        logger.set_level(LogLevel::Warn);

        assert!(!logger.would_log(LogLevel::Debug));
        assert!(!logger.would_log(LogLevel::Info));
        assert!(logger.would_log(LogLevel::Warn));
        assert!(logger.would_log(LogLevel::Fatal));
    }

    #[tokio::test]
    async fn test_clones_share_context() {
        let logger = Logger::new("TEST".to_string());
        let clone = logger.clone();
        logger.set_session_id("run-1".to_string()).await;
        clone.add_context_field("port".to_string(), 443).await;

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some("run-1"));
        assert!(context.context_fields.contains_key("port"));
    }

    #[test]
    fn test_log_formats() {
        let mut logger = Logger::new("TEST".to_string());
        logger.set_color(false);
        let entry = entry(LogLevel::Info);

        let console = logger.format_console(&entry);
        assert!(console.contains(" INFO [PROBE] Probed 1.1.1.1"));
        assert!(console.contains("received=4"));

        let json: serde_json::Value = serde_json::from_str(&logger.format_json(&entry)).unwrap();
        assert_eq!(json["level"], "Info");
        assert_eq!(json["fields"]["received"], 4);

        let compact = logger.format_compact(&entry);
        assert!(compact.contains("I PROBE: Probed 1.1.1.1"));
    }

    #[tokio::test]
    async fn test_builder_collects_probe_fields() {
        let logger = Logger::new("TEST".to_string());
        let result = ProbeResult::new("1.1.1.1".parse().unwrap(), 4, 2, Duration::from_millis(40));
        let builder = logger.info("probe").probe(&result);

        assert_eq!(builder.entry.fields["sent"], 4);
        assert_eq!(builder.entry.fields["received"], 2);
        assert_eq!(builder.entry.fields["mean_delay_ms"], 20.0);
        builder.log().await;
    }

    #[tokio::test]
    async fn test_phase_timing() {
        let mut phases = PhaseLogger::new(&Config::default());
        phases.start("latency", 3).await;
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(phases.finish("latency", 2).await.is_some());
        assert!(phases.finish("download", 0).await.is_none());
    }

    #[tokio::test]
    async fn test_factory_shares_session() {
        let factory = LoggerFactory::new(Config::default());
        let logger = factory.create_logger("APP").await;
        assert_eq!(logger.name(), "APP");

        let context = logger.context.read().await;
        assert_eq!(context.session_id.as_deref(), Some(factory.session_id()));
    }

    #[tokio::test]
    async fn test_probe_and_error_events() {
        let config = Config::default();
        let probes = ProbeLogger::new(&config);
        let address: IpAddr = "1.0.0.1".parse().unwrap();
        probes.attempt_failed(address, 1, &AppError::timeout("dial")).await;
        probes.rejected(address, &AppError::probe("status 403")).await;
        probes.download_measured(address, 5.0 * 1024.0 * 1024.0, true).await;

        let errors = ErrorEventLogger::new(&config);
        errors.log_error(&AppError::io("disk full"), Some("Writing result.csv")).await;
    }
}
