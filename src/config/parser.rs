//! Configuration parsing from CLI arguments and environment variables

use crate::{cli::Cli, config::env::EnvManager, error::Result, models::Config};
use std::path::PathBuf;

/// Builds the run configuration: defaults, then `.env`, then the process
/// environment, then explicit CLI flags
pub struct ConfigParser {
    cli: Cli,
    env_file: PathBuf,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            env_file: PathBuf::from(".env"),
        }
    }

    /// Read a different env file instead of `./.env`
    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = path.into();
        self
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file_from(&self.env_file, self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(routines) = cli.routines {
            config.routines = routines;
        }
        if let Some(ping_times) = cli.ping_times {
            config.ping_times = ping_times;
        }
        if let Some(count) = cli.download_count {
            config.test_count = count;
        }
        if let Some(seconds) = cli.download_time {
            config.download_seconds = seconds;
        }
        if let Some(port) = cli.port {
            config.tcp_port = port;
        }
        if let Some(ref url) = cli.url {
            config.test_url = url.trim().to_string();
        }
        if cli.httping {
            config.httping = true;
        }
        if let Some(code) = cli.httping_code {
            config.httping_code = code;
        }
        if let Some(ref colo) = cli.cfcolo {
            config.colo = colo.parse()?;
        }
        if let Some(ref locations) = cli.locations {
            let trimmed = locations.trim();
            config.locations_file = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        }
        if let Some(ref source) = cli.locations_url {
            config.locations_url = source.trim().to_string();
        }
        if let Some(max_delay) = cli.max_delay {
            config.max_delay_ms = max_delay;
        }
        if let Some(min_delay) = cli.min_delay {
            config.min_delay_ms = min_delay;
        }
        if let Some(rate) = cli.max_loss_rate {
            config.max_loss_rate = rate;
        }
        if let Some(speed) = cli.min_speed {
            config.min_speed_mb = speed;
        }
        if let Some(print_num) = cli.print_num {
            config.print_num = print_num;
        }
        if let Some(ref file) = cli.file {
            config.ip_file = file.trim().to_string();
        }
        if let Some(ref ip) = cli.ip {
            let trimmed = ip.trim();
            config.ip_text = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        }
        if let Some(ref output) = cli.output {
            config.output_file = output.clone();
        }
        if cli.disable_download {
            config.disable_download = true;
        }
        if cli.all_ip {
            config.all_ip = true;
        }
        if cli.seed.is_some() {
            config.seed = cli.seed;
        }
        if cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("{}", display_config_summary(config));
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    let input = match &config.ip_text {
        Some(text) => format!("inline ({})", text),
        None => config.ip_file.clone(),
    };
    summary.push(format!("Input: {}", input));
    summary.push(format!(
        "Probe: {} x{} on port {}, {} workers",
        config.probe_mode().name(),
        config.ping_times,
        config.tcp_port,
        config.effective_routines()
    ));
    if !config.colo.is_empty() {
        summary.push(format!("Edge locations: {}", config.colo));
    }
    if let Some(path) = config.locations_path() {
        summary.push(format!("Location directory: {} (source {})", path, config.locations_url));
    }
    summary.push(format!(
        "Filters: delay {}..={} ms, loss <= {:.2}",
        config.min_delay_ms, config.max_delay_ms, config.max_loss_rate
    ));
    if config.disable_download {
        summary.push("Download: disabled".to_string());
    } else {
        summary.push(format!(
            "Download: {} x {}s from {}, floor {:.2} MB/s",
            config.test_count, config.download_seconds, config.test_url, config.min_speed_mb
        ));
    }
    summary.push(format!("Output: {}", config.output_path().unwrap_or("(none)")));
    summary.push(format!("Color Output: {}", config.enable_color));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::{NamedTempFile, TempDir};

    // parse() reads the process environment
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn parser(args: &[&str], dir: &TempDir) -> ConfigParser {
        let mut argv = vec!["eit"];
        argv.extend_from_slice(args);
        ConfigParser::new(Cli::parse_from(argv)).with_env_file(dir.path().join(".env"))
    }

    #[test]
    fn test_defaults_without_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let config = parser(&[], &dir).parse().unwrap();

        assert_eq!(config.routines, crate::defaults::DEFAULT_ROUTINES);
        assert_eq!(config.test_count, crate::defaults::DEFAULT_TEST_COUNT);
        assert_eq!(config.test_url, crate::defaults::DEFAULT_TEST_URL);
        assert!(!config.verbose);
    }

    #[test]
    fn test_cli_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let config = parser(
            &[
                "-n", "50", "-t", "2", "--httping", "--cfcolo", "hkg", "--max-delay", "300",
                "--max-loss-rate", "0.5", "--ip", "1.1.1.1", "-o", "", "--seed", "9", "--no-color", "--verbose",
            ],
            &dir,
        )
        .parse()
        .unwrap();

        assert_eq!(config.routines, 50);
        assert_eq!(config.ping_times, 2);
        assert!(config.httping);
        assert!(config.colo.contains("HKG"));
        assert_eq!(config.max_delay_ms, 300);
        assert_eq!(config.max_loss_rate, 0.5);
        assert_eq!(config.ip_text.as_deref(), Some("1.1.1.1"));
        assert_eq!(config.output_path(), None);
        assert_eq!(config.seed, Some(9));
        assert!(!config.enable_color);
        assert!(config.verbose);
    }

    #[test]
    fn test_env_file_then_cli_precedence() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let mut env_file = std::fs::File::create(dir.path().join(".env")).unwrap();
        writeln!(env_file, "PING_TIMES=7").unwrap();
        writeln!(env_file, "PRINT_NUM=3").unwrap();
        drop(env_file);

        let config = parser(&["-p", "5"], &dir).parse().unwrap();
        assert_eq!(config.ping_times, 7);
        assert_eq!(config.print_num, 5);

        std::env::remove_var("PING_TIMES");
        std::env::remove_var("PRINT_NUM");
    }

    #[test]
    fn test_invalid_combination_fails_validation() {
        let _guard = ENV_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        assert!(parser(&["--min-delay", "500", "--max-delay", "100"], &dir).parse().is_err());
        assert!(parser(&["-u", "ftp://example.com/file"], &dir).parse().is_err());
        assert!(parser(&["--cfcolo", "H1"], &dir).parse().is_err());
    }

    #[test]
    fn test_config_summary() {
        let mut config = Config::default();
        let summary = display_config_summary(&config);
        assert!(summary.contains("Input: ip.txt"));
        assert!(summary.contains("Probe: TCP x4 on port 443, 200 workers"));
        assert!(summary.contains("Output: result.csv"));

        config.disable_download = true;
        config.ip_text = Some("1.1.1.1".to_string());
        let summary = display_config_summary(&config);
        assert!(summary.contains("Download: disabled"));
        assert!(summary.contains("inline (1.1.1.1)"));
    }

    #[test]
    fn test_example_env_file_round_trips_through_validation() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();
        // every example line is commented out
        let warnings = EnvManager::check_env_file(temp_file.path()).unwrap().unwrap();
        assert!(warnings.is_empty());
    }
}
