//! Configuration data model and validation

use crate::types::{AppError, ColoSet, ProbeMode, Result, StatusPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
///
/// Built once per run by the config parser and shared read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Width of the latency probing worker pool
    #[serde(default = "default_routines")]
    pub routines: usize,

    /// Probe attempts per candidate
    #[serde(default = "default_ping_times")]
    pub ping_times: u32,

    /// Number of qualifying candidates the download phase looks for
    #[serde(default = "default_test_count")]
    pub test_count: usize,

    /// Per-candidate download budget
    #[serde(default = "default_download_seconds")]
    pub download_seconds: u64,

    /// Port used for probing and downloading
    #[serde(default = "default_tcp_port")]
    pub tcp_port: u16,

    /// Download resource, also the HTTP probe target
    #[serde(default = "default_test_url")]
    pub test_url: String,

    /// Probe with HTTP HEAD requests instead of raw TCP connects
    #[serde(default)]
    pub httping: bool,

    /// Accepted validation status code, 0 means 200/301/302
    #[serde(default)]
    pub httping_code: u16,

    /// Edge-location allow-set (HTTP probing only)
    #[serde(default)]
    pub colo: ColoSet,

    /// Location directory file; enables region/city lookup for HTTP results
    #[serde(default)]
    pub locations_file: Option<String>,

    /// Where the location directory is downloaded from when the file is missing
    #[serde(default = "default_locations_url")]
    pub locations_url: String,

    /// Upper bound on mean delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Lower bound on mean delay in milliseconds
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound on loss rate, 0.00 ..= 1.00
    #[serde(default = "default_max_loss_rate")]
    pub max_loss_rate: f32,

    /// Download speed floor in MB/s
    #[serde(default = "default_min_speed_mb")]
    pub min_speed_mb: f64,

    /// Rows to print, 0 disables console output
    #[serde(default = "default_print_num")]
    pub print_num: usize,

    /// Newline-delimited file of IP/CIDR tokens
    #[serde(default = "default_ip_file")]
    pub ip_file: String,

    /// Comma-separated inline tokens, takes precedence over `ip_file`
    #[serde(default)]
    pub ip_text: Option<String>,

    /// CSV output path, empty disables the file
    #[serde(default = "default_output_file")]
    pub output_file: String,

    /// Skip the download phase and rank by delay
    #[serde(default)]
    pub disable_download: bool,

    /// Sample every address of each IPv4 /24 instead of one
    #[serde(default)]
    pub all_ip: bool,

    /// Fixed sampler seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            routines: default_routines(),
            ping_times: default_ping_times(),
            test_count: default_test_count(),
            download_seconds: default_download_seconds(),
            tcp_port: default_tcp_port(),
            test_url: default_test_url(),
            httping: false,
            httping_code: 0,
            colo: ColoSet::default(),
            locations_file: None,
            locations_url: default_locations_url(),
            max_delay_ms: default_max_delay_ms(),
            min_delay_ms: default_min_delay_ms(),
            max_loss_rate: default_max_loss_rate(),
            min_speed_mb: default_min_speed_mb(),
            print_num: default_print_num(),
            ip_file: default_ip_file(),
            ip_text: None,
            output_file: default_output_file(),
            disable_download: false,
            all_ip: false,
            seed: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the download budget as Duration
    pub fn download_time(&self) -> Duration {
        Duration::from_secs(self.download_seconds)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    /// Speed floor in bytes per second
    pub fn min_speed_bytes(&self) -> f64 {
        self.min_speed_mb * 1024.0 * 1024.0
    }

    pub fn probe_mode(&self) -> ProbeMode {
        if self.httping {
            ProbeMode::Http
        } else {
            ProbeMode::Tcp
        }
    }

    pub fn status_policy(&self) -> StatusPolicy {
        StatusPolicy::from_code(self.httping_code)
    }

    /// Worker pool width, clamped to the supported maximum
    pub fn effective_routines(&self) -> usize {
        self.routines.clamp(1, crate::defaults::MAX_ROUTINES)
    }

    pub fn uses_default_url(&self) -> bool {
        self.test_url == crate::defaults::DEFAULT_TEST_URL
    }

    /// Location directory path, only when HTTP probing can report codes
    pub fn locations_path(&self) -> Option<&str> {
        if self.httping {
            self.locations_file.as_deref()
        } else {
            None
        }
    }

    /// CSV path, `None` when file output is disabled
    pub fn output_path(&self) -> Option<&str> {
        if self.output_file.trim().is_empty() {
            None
        } else {
            Some(self.output_file.as_str())
        }
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.routines == 0 {
            return Err(AppError::config("Concurrency (routines) must be greater than 0"));
        }

        if self.ping_times == 0 {
            return Err(AppError::config("Ping times must be greater than 0"));
        }

        if self.test_count == 0 {
            return Err(AppError::config("Download test count must be greater than 0"));
        }

        if self.download_seconds == 0 {
            return Err(AppError::config("Download time must be greater than 0"));
        }

        if self.download_seconds > crate::defaults::MAX_DOWNLOAD_SECONDS {
            return Err(AppError::config(format!(
                "Download time cannot exceed {} seconds, got {}",
                crate::defaults::MAX_DOWNLOAD_SECONDS,
                self.download_seconds
            )));
        }

        if self.tcp_port == 0 {
            return Err(AppError::config("TCP port must be between 1 and 65535"));
        }

        match url::Url::parse(&self.test_url) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("Test URL must use HTTP or HTTPS: {}", self.test_url)));
                }
                if parsed.host_str().is_none() {
                    return Err(AppError::config(format!("Test URL has no host: {}", self.test_url)));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid test URL '{}': {}", self.test_url, e)));
            }
        }

        if self.locations_file.is_some() {
            match url::Url::parse(&self.locations_url) {
                Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => {}
                _ => {
                    return Err(AppError::config(format!(
                        "Invalid location directory URL: {}",
                        self.locations_url
                    )));
                }
            }
        }

        if self.httping_code != 0 && !(100..=599).contains(&self.httping_code) {
            return Err(AppError::config(format!(
                "HTTP status code must be between 100 and 599, got {}",
                self.httping_code
            )));
        }

        if !(0.0..=1.0).contains(&self.max_loss_rate) {
            return Err(AppError::config(format!(
                "Max loss rate must be between 0.00 and 1.00, got {:.2}",
                self.max_loss_rate
            )));
        }

        if self.min_speed_mb < 0.0 || !self.min_speed_mb.is_finite() {
            return Err(AppError::config("Min download speed cannot be negative"));
        }

        if self.min_delay_ms > self.max_delay_ms {
            return Err(AppError::config(format!(
                "Min delay ({} ms) cannot exceed max delay ({} ms)",
                self.min_delay_ms, self.max_delay_ms
            )));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(value) = env_value("ROUTINES")? {
            self.routines = value;
        }

        if let Some(value) = env_value("PING_TIMES")? {
            self.ping_times = value;
        }

        if let Some(value) = env_value("TEST_COUNT")? {
            self.test_count = value;
        }

        if let Some(value) = env_value("DOWNLOAD_SECONDS")? {
            self.download_seconds = value;
        }

        if let Some(value) = env_value("TCP_PORT")? {
            self.tcp_port = value;
        }

        if let Ok(test_url) = std::env::var("TEST_URL") {
            self.test_url = test_url.trim().to_string();
        }

        if let Some(value) = env_value("HTTPING")? {
            self.httping = value;
        }

        if let Some(value) = env_value("HTTPING_CODE")? {
            self.httping_code = value;
        }

        if let Ok(colo) = std::env::var("CF_COLO") {
            self.colo = colo.parse()?;
        }

        if let Ok(locations) = std::env::var("LOCATIONS_FILE") {
            let trimmed = locations.trim();
            self.locations_file = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        }

        if let Ok(source) = std::env::var("LOCATIONS_URL") {
            self.locations_url = source.trim().to_string();
        }

        if let Some(value) = env_value("MAX_DELAY_MS")? {
            self.max_delay_ms = value;
        }

        if let Some(value) = env_value("MIN_DELAY_MS")? {
            self.min_delay_ms = value;
        }

        if let Some(value) = env_value("MAX_LOSS_RATE")? {
            self.max_loss_rate = value;
        }

        if let Some(value) = env_value("MIN_SPEED_MB")? {
            self.min_speed_mb = value;
        }

        if let Some(value) = env_value("PRINT_NUM")? {
            self.print_num = value;
        }

        if let Ok(ip_file) = std::env::var("IP_FILE") {
            self.ip_file = ip_file.trim().to_string();
        }

        if let Ok(ip_text) = std::env::var("IP_TEXT") {
            let trimmed = ip_text.trim();
            self.ip_text = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        }

        if let Ok(output_file) = std::env::var("OUTPUT_FILE") {
            self.output_file = output_file;
        }

        if let Some(value) = env_value("DISABLE_DOWNLOAD")? {
            self.disable_download = value;
        }

        if let Some(value) = env_value("ALL_IP")? {
            self.all_ip = value;
        }

        if let Some(value) = env_value("ENABLE_COLOR")? {
            self.enable_color = value;
        }

        Ok(())
    }
}

/// Read and parse one environment variable, `None` when unset
fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_routines() -> usize {
    crate::defaults::DEFAULT_ROUTINES
}

fn default_ping_times() -> u32 {
    crate::defaults::DEFAULT_PING_TIMES
}

fn default_test_count() -> usize {
    crate::defaults::DEFAULT_TEST_COUNT
}

fn default_download_seconds() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_TIME.as_secs()
}

fn default_tcp_port() -> u16 {
    crate::defaults::DEFAULT_TCP_PORT
}

fn default_test_url() -> String {
    crate::defaults::DEFAULT_TEST_URL.to_string()
}

fn default_locations_url() -> String {
    crate::defaults::DEFAULT_LOCATIONS_URL.to_string()
}

fn default_max_delay_ms() -> u64 {
    crate::defaults::DEFAULT_MAX_DELAY.as_millis() as u64
}

fn default_min_delay_ms() -> u64 {
    crate::defaults::DEFAULT_MIN_DELAY.as_millis() as u64
}

fn default_max_loss_rate() -> f32 {
    crate::defaults::DEFAULT_MAX_LOSS_RATE
}

fn default_min_speed_mb() -> f64 {
    crate::defaults::DEFAULT_MIN_SPEED_MB
}

fn default_print_num() -> usize {
    crate::defaults::DEFAULT_PRINT_NUM
}

fn default_ip_file() -> String {
    crate::defaults::DEFAULT_IP_FILE.to_string()
}

fn default_output_file() -> String {
    crate::defaults::DEFAULT_OUTPUT.to_string()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_mode(), ProbeMode::Tcp);
        assert_eq!(config.status_policy(), StatusPolicy::Default);
        assert!(config.uses_default_url());
        assert_eq!(config.output_path(), Some("result.csv"));
    }

    #[test]
    fn test_zero_counts_invalid() {
        let mut config = Config::default();
        config.routines = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ping_times = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.test_count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.download_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tcp_port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_download_time_upper_bound() {
        let mut config = Config::default();
        config.download_seconds = crate::defaults::MAX_DOWNLOAD_SECONDS;
        assert!(config.validate().is_ok());

        config.download_seconds = u64::MAX;
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert!(err.to_string().contains("cannot exceed"));
    }

    #[test]
    fn test_invalid_test_url() {
        let mut config = Config::default();
        config.test_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.test_url = "ftp://example.com/file".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_status_code_range() {
        let mut config = Config::default();
        config.httping_code = 204;
        assert!(config.validate().is_ok());
        assert_eq!(config.status_policy(), StatusPolicy::Exact(204));

        config.httping_code = 700;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_loss_and_speed_bounds() {
        let mut config = Config::default();
        config.max_loss_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.min_speed_mb = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delay_window_order() {
        let mut config = Config::default();
        config.min_delay_ms = 300;
        config.max_delay_ms = 200;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_routines_clamped() {
        let mut config = Config::default();
        config.routines = 5000;
        assert_eq!(config.effective_routines(), 1000);
        config.routines = 16;
        assert_eq!(config.effective_routines(), 16);
    }

    #[test]
    fn test_blank_output_disables_file() {
        let mut config = Config::default();
        config.output_file = " ".to_string();
        assert_eq!(config.output_path(), None);
        config.output_file = String::new();
        assert_eq!(config.output_path(), None);
    }

    #[test]
    fn test_locations_only_with_httping() {
        let mut config = Config::default();
        config.locations_file = Some("locations.json".to_string());
        assert_eq!(config.locations_path(), None);

        config.httping = true;
        assert_eq!(config.locations_path(), Some("locations.json"));
        assert!(config.validate().is_ok());

        config.locations_url = "ftp://example.com/locations".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_speed_in_bytes() {
        let mut config = Config::default();
        config.min_speed_mb = 2.0;
        assert_eq!(config.min_speed_bytes(), 2.0 * 1024.0 * 1024.0);
    }
}
