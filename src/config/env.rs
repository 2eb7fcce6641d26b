//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::types::ColoSet;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file; variables already set in the process win
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        let mut content = String::from(
            "# Edge IP Tester Configuration\n\
             #\n\
             # Values here are used as defaults and can be overridden by\n\
             # environment variables and command-line arguments.\n\n",
        );

        for (var, description, example) in Self::get_supported_env_vars() {
            content.push_str(&format!("# {}\n# {}={}\n\n", description, var, example));
        }

        content
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let invalid = |e: &dyn std::fmt::Display| AppError::config(format!("Invalid {} value '{}': {}", key, value, e));

        match key {
            "ROUTINES" | "PING_TIMES" | "TEST_COUNT" | "DOWNLOAD_SECONDS" => {
                let number: u64 = value.parse().map_err(|e| invalid(&e))?;
                if number == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
                if key == "DOWNLOAD_SECONDS" && number > crate::defaults::MAX_DOWNLOAD_SECONDS {
                    return Err(AppError::config(format!(
                        "DOWNLOAD_SECONDS cannot exceed {}",
                        crate::defaults::MAX_DOWNLOAD_SECONDS
                    )));
                }
            }
            "PRINT_NUM" | "MAX_DELAY_MS" | "MIN_DELAY_MS" => {
                value.parse::<u64>().map_err(|e| invalid(&e))?;
            }
            "TCP_PORT" => {
                let port: u16 = value.parse().map_err(|e| invalid(&e))?;
                if port == 0 {
                    return Err(AppError::config("TCP_PORT must be between 1 and 65535"));
                }
            }
            "HTTPING_CODE" => {
                let code: u16 = value.parse().map_err(|e| invalid(&e))?;
                if code != 0 && !(100..=599).contains(&code) {
                    return Err(AppError::config(format!(
                        "HTTPING_CODE must be between 100 and 599, got: {}",
                        code
                    )));
                }
            }
            "TEST_URL" | "LOCATIONS_URL" => {
                let parsed = url::Url::parse(value).map_err(|e| invalid(&e))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("{} must use HTTP or HTTPS: {}", key, value)));
                }
            }
            "CF_COLO" => {
                value.parse::<ColoSet>()?;
            }
            "MAX_LOSS_RATE" => {
                let rate: f32 = value.parse().map_err(|e| invalid(&e))?;
                if !(0.0..=1.0).contains(&rate) {
                    return Err(AppError::config(format!("MAX_LOSS_RATE must be between 0 and 1, got: {}", rate)));
                }
            }
            "MIN_SPEED_MB" => {
                let speed: f64 = value.parse().map_err(|e| invalid(&e))?;
                if speed < 0.0 {
                    return Err(AppError::config("MIN_SPEED_MB cannot be negative"));
                }
            }
            "HTTPING" | "DISABLE_DOWNLOAD" | "ALL_IP" | "ENABLE_COLOR" => {
                value.parse::<bool>().map_err(|e| invalid(&e))?;
            }
            _ => {
                // IP_FILE, IP_TEXT, OUTPUT_FILE and LOCATIONS_FILE are free-form; unknown keys are ignored
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("ROUTINES", "Latency probing concurrency (max 1000)", "200"),
            ("PING_TIMES", "Probe attempts per address", "4"),
            ("TEST_COUNT", "Addresses the download test must qualify", "10"),
            ("DOWNLOAD_SECONDS", "Download budget per address in seconds", "10"),
            ("TCP_PORT", "Port for probing and downloading", "443"),
            ("TEST_URL", "Download test URL, also the HTTP probe target", crate::defaults::DEFAULT_TEST_URL),
            ("HTTPING", "Probe with HTTP HEAD instead of TCP connect", "false"),
            ("HTTPING_CODE", "Accepted HTTP probe status, 0 for 200/301/302", "0"),
            ("CF_COLO", "Comma-separated edge-location allow-list", "HKG,SJC"),
            ("LOCATIONS_FILE", "Location directory for region/city lookup (HTTP probing)", "locations.json"),
            ("LOCATIONS_URL", "Location directory download source", crate::defaults::DEFAULT_LOCATIONS_URL),
            ("MAX_DELAY_MS", "Upper mean-delay bound in milliseconds", "9999"),
            ("MIN_DELAY_MS", "Lower mean-delay bound in milliseconds", "0"),
            ("MAX_LOSS_RATE", "Upper loss-rate bound (0-1)", "1.0"),
            ("MIN_SPEED_MB", "Download speed floor in MB/s", "0"),
            ("PRINT_NUM", "Results to print, 0 prints nothing", "10"),
            ("IP_FILE", "File of IPs and CIDR ranges", "ip.txt"),
            ("IP_TEXT", "Inline comma-separated IPs and ranges", "1.1.1.1,1.0.0.0/24"),
            ("OUTPUT_FILE", "CSV output path, empty disables it", "result.csv"),
            ("DISABLE_DOWNLOAD", "Skip the download test", "false"),
            ("ALL_IP", "Test every address of each IPv4 /24", "false"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }

    /// Check if .env file exists and validate its contents
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }

    /// Every problem found in the env file at `path` and the process environment
    pub fn audit(path: &Path) -> Result<Vec<String>> {
        let mut findings = Self::check_env_file(path)?.unwrap_or_default();
        findings.extend(Self::validate_current_env());
        Ok(findings)
    }
}
