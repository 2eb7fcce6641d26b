//! Edge IP Tester
//!
//! Discovers which addresses inside published CDN IP ranges answer a test
//! endpoint fastest and most reliably, then ranks them by packet loss,
//! latency and sustained download throughput.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod locations;
pub mod logging;
pub mod models;
pub mod output;
pub mod probe;
pub mod ranges;
pub mod ranking;
pub mod types;
pub mod updater;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Candidate, Config, ProbeResult, RankedRecord};
pub use ranges::{AddressBlock, CandidateSampler, SamplingPolicy};
pub use probe::{LatencyProber, ProbeStrategy, TcpProbe, HttpProbe};
pub use download::{ThroughputEstimator, ThroughputOutcome, SpeedMeasurer, HttpSpeedMeasurer};
pub use ranking::Ranker;
pub use output::{Reporter, CsvReporter, ConsoleReporter};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Version line with build metadata, e.g. `0.1.0 (abc1234, 2026-01-01 00:00:00 UTC)`
pub fn build_info() -> String {
    match GIT_COMMIT {
        Some(commit) => format!("{} ({}, {})", VERSION, commit, BUILD_TIME),
        None => format!("{} ({})", VERSION, BUILD_TIME),
    }
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_ROUTINES: usize = 200;
    pub const MAX_ROUTINES: usize = 1000;
    pub const DEFAULT_PING_TIMES: u32 = 4;
    pub const DEFAULT_TEST_COUNT: usize = 10;
    pub const DEFAULT_DOWNLOAD_TIME: Duration = Duration::from_secs(10);
    pub const MAX_DOWNLOAD_SECONDS: u64 = 3600;
    pub const DEFAULT_TCP_PORT: u16 = 443;
    pub const DEFAULT_TEST_URL: &str = "https://speed.cloudflare.com/__down?bytes=200000000";

    pub const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
    pub const MAX_DOWNLOAD_REDIRECTS: usize = 10;

    /// Delay window that means "no delay filtering"
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(9999);
    pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(0);
    pub const DEFAULT_MAX_LOSS_RATE: f32 = 1.0;
    pub const DEFAULT_MIN_SPEED_MB: f64 = 0.0;

    pub const DEFAULT_PRINT_NUM: usize = 10;
    pub const DEFAULT_IP_FILE: &str = "ip.txt";
    pub const DEFAULT_OUTPUT: &str = "result.csv";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_LOCATIONS_URL: &str = "https://speed.cloudflare.com/locations";

    pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/98.0.4758.80 Safari/537.36";
}
