//! Command-line interface module with comprehensive help system

pub mod help;

pub use help::HelpSystem;

use clap::Parser;

/// Edge IP Tester - ranks CDN edge addresses by latency, loss and download speed
///
/// Value options left unset fall back to the environment, then to `.env`,
/// then to built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "eit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Latency probing concurrency (max 1000)
    #[arg(short = 'n', long, value_name = "N")]
    pub routines: Option<usize>,

    /// Probe attempts per address
    #[arg(short = 't', long, value_name = "N")]
    pub ping_times: Option<u32>,

    /// Number of addresses the download test must qualify
    #[arg(short = 'd', long, value_name = "N")]
    pub download_count: Option<usize>,

    /// Download test budget per address, in seconds
    #[arg(short = 'D', long, value_name = "SECS", value_parser = parse_seconds)]
    pub download_time: Option<u64>,

    /// Port used for probing and downloading
    #[arg(short = 'P', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Download test URL, also the HTTP probe target
    #[arg(short = 'u', long, value_name = "URL")]
    pub url: Option<String>,

    /// Probe with HTTP HEAD requests instead of TCP connects
    #[arg(long)]
    pub httping: bool,

    /// Status code an HTTP probe must return (default 200, 301 or 302)
    #[arg(long, value_name = "CODE")]
    pub httping_code: Option<u16>,

    /// Edge-location codes to keep, comma-separated (HTTP probing only)
    #[arg(long, value_name = "CODES")]
    pub cfcolo: Option<String>,

    /// Location directory (JSON) used to add region and city to HTTP results;
    /// downloaded from --locations-url when the file is missing
    #[arg(long, value_name = "FILE")]
    pub locations: Option<String>,

    /// Source of the location directory
    #[arg(long, value_name = "URL")]
    pub locations_url: Option<String>,

    /// Upper mean-delay bound in milliseconds
    #[arg(long, value_name = "MS")]
    pub max_delay: Option<u64>,

    /// Lower mean-delay bound in milliseconds
    #[arg(long, value_name = "MS")]
    pub min_delay: Option<u64>,

    /// Upper loss-rate bound, 0.00 to 1.00
    #[arg(long, value_name = "RATE")]
    pub max_loss_rate: Option<f32>,

    /// Download speed floor in MB/s
    #[arg(long, value_name = "MB/S")]
    pub min_speed: Option<f64>,

    /// Number of results to print, 0 prints nothing
    #[arg(short = 'p', long, value_name = "N")]
    pub print_num: Option<usize>,

    /// File of IP addresses and CIDR ranges, one per line
    #[arg(short = 'f', long, value_name = "FILE")]
    pub file: Option<String>,

    /// Inline comma-separated addresses or ranges, overrides --file
    #[arg(long, value_name = "LIST")]
    pub ip: Option<String>,

    /// CSV output file, empty disables it
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<String>,

    /// Skip the download test and rank by delay
    #[arg(long)]
    pub disable_download: bool,

    /// Test every address of each IPv4 /24 instead of one random address
    #[arg(long)]
    pub all_ip: bool,

    /// Fixed seed for address sampling
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Check for a newer release and exit (needs UPDATE_URL unless the build
    /// names a GitHub repository)
    #[arg(long)]
    pub check_update: bool,

    /// Validate `.env` and the current environment, then exit
    #[arg(long)]
    pub check_env: bool,

    /// Write a commented example `.env` to FILE and exit
    #[arg(long, value_name = "FILE")]
    pub env_example: Option<String>,

    /// Show help for specific topic (input, probing, download, filters, output, examples)
    #[arg(long, value_name = "TOPIC")]
    pub help_topic: Option<String>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if let Some(rate) = self.max_loss_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(format!("--max-loss-rate must be between 0.00 and 1.00, got {}", rate));
            }
        }

        if let (Some(min), Some(max)) = (self.min_delay, self.max_delay) {
            if min > max {
                return Err(format!("--min-delay ({}) cannot exceed --max-delay ({})", min, max));
            }
        }

        if let Some(speed) = self.min_speed {
            if speed < 0.0 || !speed.is_finite() {
                return Err("--min-speed cannot be negative".to_string());
            }
        }

        if let Some(code) = self.httping_code {
            if code != 0 && !(100..=599).contains(&code) {
                return Err(format!("--httping-code must be between 100 and 599, got {}", code));
            }
        }

        Ok(())
    }

    /// Check if help should be displayed for a specific topic
    pub fn should_show_topic_help(&self) -> bool {
        self.help_topic.is_some()
    }

    /// Get the help topic if specified
    pub fn get_help_topic(&self) -> Option<&str> {
        self.help_topic.as_deref()
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        !self.no_color && supports_color()
    }

    /// Display help for the specified topic or main help
    pub fn display_help(&self) -> String {
        let help_system = HelpSystem::new();
        let use_colors = self.use_colors();

        if let Some(topic) = &self.help_topic {
            help_system.display_topic_help(topic, use_colors).unwrap_or_else(|| {
                format!(
                    "Unknown help topic: '{}'\n\nAvailable topics: {}\n\n{}",
                    topic,
                    HelpSystem::topic_names().join(", "),
                    help_system.display_main_help(use_colors)
                )
            })
        } else {
            help_system.display_main_help(use_colors)
        }
    }
}

/// Parse a positive number of seconds, at most `MAX_DOWNLOAD_SECONDS`
fn parse_seconds(s: &str) -> Result<u64, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid duration: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid duration: {}", s))
        .and_then(|secs| match secs {
            0 => Err("Duration must be greater than 0".to_string()),
            secs if secs > crate::defaults::MAX_DOWNLOAD_SECONDS => Err(format!(
                "Duration cannot exceed {} seconds",
                crate::defaults::MAX_DOWNLOAD_SECONDS
            )),
            secs => Ok(secs),
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
