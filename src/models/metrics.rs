//! Candidate, probe result and ranked record data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// One concrete address selected for testing, plus the port to test it on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub address: IpAddr,
    pub port: u16,
}

impl Candidate {
    pub fn new(address: IpAddr, port: u16) -> Self {
        Self { address, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Aggregated outcome of probing one candidate
///
/// The loss rate is computed once when the result is built; the fields are
/// not meant to be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub address: IpAddr,
    pub sent: u32,
    pub received: u32,
    pub total_delay: Duration,
    loss_rate: f32,
    /// Edge-location code reported by the serving node (HTTP probing only)
    #[serde(default)]
    pub location: Option<String>,
}

impl ProbeResult {
    pub fn new(address: IpAddr, sent: u32, received: u32, total_delay: Duration) -> Self {
        let received = received.min(sent);
        let loss_rate = if sent == 0 {
            1.0
        } else {
            (sent - received) as f32 / sent as f32
        };

        Self {
            address,
            sent,
            received,
            total_delay,
            loss_rate,
            location: None,
        }
    }

    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location;
        self
    }

    /// A candidate that never answered (or was rejected by validation)
    pub fn unreachable(address: IpAddr, sent: u32) -> Self {
        Self::new(address, sent, 0, Duration::ZERO)
    }

    pub fn loss_rate(&self) -> f32 {
        self.loss_rate
    }

    /// Mean delay over successful attempts, `None` when nothing succeeded
    pub fn mean_delay(&self) -> Option<Duration> {
        if self.received == 0 {
            None
        } else {
            Some(self.total_delay / self.received)
        }
    }

    pub fn mean_delay_ms(&self) -> Option<f64> {
        self.mean_delay().map(|d| d.as_secs_f64() * 1000.0)
    }

    pub fn is_reachable(&self) -> bool {
        self.received > 0
    }
}

/// Region and city of an edge location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeSite {
    pub region: String,
    pub city: String,
}

/// A probe result with its measured download speed in bytes per second
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub probe: ProbeResult,
    pub download_speed: Option<f64>,
    /// Filled in from the location directory when one is configured
    #[serde(default)]
    pub site: Option<EdgeSite>,
}

impl RankedRecord {
    pub const CSV_HEADER: [&'static str; 6] = [
        "IP Address",
        "Sent",
        "Received",
        "Loss Rate",
        "Average Delay (ms)",
        "Download Speed (MB/s)",
    ];

    /// Trailing columns written when any record carries a location code
    pub const LOCATION_HEADER: [&'static str; 3] = ["Colo", "Region", "City"];

    pub fn untested(probe: ProbeResult) -> Self {
        Self {
            probe,
            download_speed: None,
            site: None,
        }
    }

    pub fn with_speed(probe: ProbeResult, speed: f64) -> Self {
        Self {
            probe,
            download_speed: Some(speed),
            site: None,
        }
    }

    pub fn address(&self) -> IpAddr {
        self.probe.address
    }

    pub fn location_code(&self) -> Option<&str> {
        self.probe.location.as_deref()
    }

    /// Colo, region and city cells; unknown parts are empty
    pub fn location_cells(&self) -> [String; 3] {
        let (region, city) = match &self.site {
            Some(site) => (site.region.clone(), site.city.clone()),
            None => (String::new(), String::new()),
        };
        [self.location_code().unwrap_or_default().to_string(), region, city]
    }

    /// Download speed in MB/s, zero when untested
    pub fn speed_mb(&self) -> f64 {
        self.download_speed.unwrap_or(0.0) / 1024.0 / 1024.0
    }

    /// Output row: address, sent, received, loss, mean delay (ms), speed (MB/s)
    pub fn to_row(&self) -> [String; 6] {
        [
            self.probe.address.to_string(),
            self.probe.sent.to_string(),
            self.probe.received.to_string(),
            format!("{:.2}", self.probe.loss_rate()),
            format!("{:.2}", self.probe.mean_delay_ms().unwrap_or(0.0)),
            format!("{:.2}", self.speed_mb()),
        ]
    }
}

impl From<ProbeResult> for RankedRecord {
    fn from(probe: ProbeResult) -> Self {
        Self::untested(probe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_all_attempts_succeeded() {
        let result = ProbeResult::new(addr("1.1.1.1"), 4, 4, Duration::from_millis(80));
        assert_eq!(result.loss_rate(), 0.0);
        assert_eq!(result.mean_delay(), Some(Duration::from_millis(20)));
        assert!(result.is_reachable());
    }

    #[test]
    fn test_no_attempt_succeeded() {
        let result = ProbeResult::unreachable(addr("1.1.1.1"), 4);
        assert_eq!(result.loss_rate(), 1.0);
        assert_eq!(result.mean_delay(), None);
        assert!(!result.is_reachable());
    }

    #[test]
    fn test_partial_loss() {
        let result = ProbeResult::new(addr("1.0.0.1"), 4, 3, Duration::from_millis(90));
        assert_eq!(result.loss_rate(), 0.25);
        assert_eq!(result.mean_delay(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn test_zero_sent_counts_as_total_loss() {
        let result = ProbeResult::new(addr("1.0.0.1"), 0, 0, Duration::ZERO);
        assert_eq!(result.loss_rate(), 1.0);
    }

    #[test]
    fn test_row_formatting() {
        let probe = ProbeResult::new(addr("104.16.0.1"), 4, 3, Duration::from_millis(100));
        let record = RankedRecord::with_speed(probe, 12.5 * 1024.0 * 1024.0);
        assert_eq!(
            record.to_row(),
            ["104.16.0.1", "4", "3", "0.25", "33.33", "12.50"].map(String::from)
        );
    }

    #[test]
    fn test_untested_row_reports_zero_speed() {
        let probe = ProbeResult::unreachable(addr("2606:4700::1"), 4);
        let record = RankedRecord::from(probe);
        let row = record.to_row();
        assert_eq!(row[0], "2606:4700::1");
        assert_eq!(row[3], "1.00");
        assert_eq!(row[4], "0.00");
        assert_eq!(row[5], "0.00");
    }

    #[test]
    fn test_location_cells() {
        let probe = ProbeResult::new(addr("104.16.0.1"), 4, 4, Duration::from_millis(40))
            .with_location(Some("SJC".to_string()));
        let mut record = RankedRecord::untested(probe);
        assert_eq!(record.location_code(), Some("SJC"));
        assert_eq!(record.location_cells(), ["SJC", "", ""].map(String::from));

        record.site = Some(EdgeSite {
            region: "North America".to_string(),
            city: "San Jose".to_string(),
        });
        assert_eq!(record.location_cells(), ["SJC", "North America", "San Jose"].map(String::from));

        let plain = RankedRecord::untested(ProbeResult::unreachable(addr("1.1.1.1"), 4));
        assert_eq!(plain.location_cells(), ["", "", ""].map(String::from));
    }

    #[test]
    fn test_candidate_display() {
        let v4 = Candidate::new(addr("1.1.1.1"), 443);
        let v6 = Candidate::new(addr("2606:4700::1"), 8443);
        assert_eq!(v4.to_string(), "1.1.1.1:443");
        assert_eq!(v6.to_string(), "[2606:4700::1]:8443");
    }
}
