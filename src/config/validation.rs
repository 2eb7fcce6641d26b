//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
};
use colored::*;

/// Advisory checks layered on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration, returning advisories for settings that are
    /// legal but probably not what the user meant
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        // Hard errors first
        config.validate()?;

        warnings.extend(Self::validate_probe_settings(config));
        warnings.extend(Self::validate_test_url(config));
        warnings.extend(Self::validate_download_settings(config));

        Ok(warnings)
    }

    fn validate_probe_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.routines > crate::defaults::MAX_ROUTINES {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Concurrency of {} exceeds the maximum, {} workers will be used",
                    config.routines,
                    crate::defaults::MAX_ROUTINES
                ),
            ));
        }

        if !config.colo.is_empty() && !config.httping {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Edge-location filter '{}' only applies with --httping and will be ignored", config.colo),
            ));
        }

        if let (Some(path), false) = (&config.locations_file, config.httping) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Location directory '{}' only applies with --httping and will be ignored", path),
            ));
        }

        if config.httping_code != 0 && !config.httping {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Status code {} only applies with --httping", config.httping_code),
            ));
        }

        if config.ping_times > 20 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} probe attempts per address will slow the latency phase", config.ping_times),
            ));
        }

        warnings
    }

    fn validate_test_url(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let Ok(parsed) = url::Url::parse(&config.test_url) else {
            return warnings;
        };

        if config.httping && config.uses_default_url() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "HTTP probing against the default test URL; set --url to probe your own site".to_string(),
            ));
        }

        if parsed.scheme() == "http" && config.tcp_port == 443 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Test URL '{}' is plain HTTP but the port is 443", config.test_url),
            ));
        }

        let ip_host = matches!(parsed.host(), Some(url::Host::Ipv4(_)) | Some(url::Host::Ipv6(_)));
        if parsed.scheme() == "https" && ip_host {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "HTTPS test URL '{}' names an IP address; certificate checks will fail, use a host name",
                    config.test_url
                ),
            ));
        }

        match parsed.host() {
            Some(url::Host::Ipv4(ip)) if ip.is_loopback() || ip.is_private() => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Test URL '{}' targets a private/local network", config.test_url),
                ));
            }
            Some(url::Host::Domain("localhost")) => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Test URL '{}' targets localhost", config.test_url),
                ));
            }
            _ => {}
        }

        warnings
    }

    fn validate_download_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.disable_download {
            if config.min_speed_mb > 0.0 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    "Download test is disabled, the speed floor will be ignored".to_string(),
                ));
            }
            return warnings;
        }

        // Every address is queued when a floor is set
        if config.min_speed_mb > 0.0 && config.max_delay_ms == crate::defaults::DEFAULT_MAX_DELAY.as_millis() as u64 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Speed floor without a delay cap: the download test may run for a long time, consider --max-delay"
                    .to_string(),
            ));
        }

        let budget = config.test_count as u64 * config.download_seconds;
        if budget > 600 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Download test may take at least {} seconds", budget),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> Color {
        match self {
            Self::Info => Color::Blue,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
        }
    }
}

/// Validation warning with level and message
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()).bold(), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
