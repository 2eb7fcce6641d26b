//! Sequential download throughput estimation
//!
//! Candidates are measured one at a time, in filter order, so downloads never
//! compete for bandwidth. Scanning stops as soon as enough candidates reach
//! the speed floor.

pub mod ewma;
pub mod http;
pub mod meter;

pub use ewma::MovingAverage;
pub use http::{HttpSpeedMeasurer, SpeedMeasurer};
pub use meter::{measure_stream, Measurement, StopReason};

use crate::logging::ProbeLogger;
use crate::models::{Config, ProbeResult, RankedRecord};
use indicatif::ProgressBar;
use std::sync::Arc;

/// What the throughput phase produced
#[derive(Debug, Clone, PartialEq)]
pub enum ThroughputOutcome {
    /// Throughput testing was disabled or had nothing to test
    Skipped(Vec<RankedRecord>),
    /// Candidates that reached the speed floor, in measurement order
    Qualified(Vec<RankedRecord>),
    /// Nobody qualified: the whole pool, measured speeds attached where taken
    Fallback(Vec<RankedRecord>),
}

impl ThroughputOutcome {
    pub fn records(&self) -> &[RankedRecord] {
        match self {
            Self::Skipped(records) | Self::Qualified(records) | Self::Fallback(records) => records,
        }
    }

    pub fn into_records(self) -> Vec<RankedRecord> {
        match self {
            Self::Skipped(records) | Self::Qualified(records) | Self::Fallback(records) => records,
        }
    }

    /// True when the records should be ordered by speed
    pub fn has_speeds(&self) -> bool {
        matches!(self, Self::Qualified(_))
    }
}

pub struct ThroughputEstimator {
    measurer: Arc<dyn SpeedMeasurer>,
    test_count: usize,
    min_speed: f64,
    disabled: bool,
    progress: ProgressBar,
    logger: Option<ProbeLogger>,
}

impl ThroughputEstimator {
    /// `min_speed` is in bytes per second
    pub fn new(measurer: Arc<dyn SpeedMeasurer>, test_count: usize, min_speed: f64) -> Self {
        Self {
            measurer,
            test_count,
            min_speed,
            disabled: false,
            progress: ProgressBar::hidden(),
            logger: None,
        }
    }

    pub fn from_config(measurer: Arc<dyn SpeedMeasurer>, config: &Config) -> Self {
        Self::new(measurer, config.test_count, config.min_speed_bytes()).with_disabled(config.disable_download)
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// How many candidates to queue and how many must qualify
    ///
    /// A pool smaller than the requested count, or any speed floor, queues
    /// the whole pool.
    pub fn plan(&self, pool_len: usize) -> (usize, usize) {
        let queued = if pool_len < self.test_count || self.min_speed > 0.0 {
            pool_len
        } else {
            self.test_count
        };
        (queued, self.test_count.min(queued))
    }

    pub async fn estimate(&self, pool: Vec<ProbeResult>) -> ThroughputOutcome {
        if self.disabled || pool.is_empty() {
            return ThroughputOutcome::Skipped(pool.into_iter().map(RankedRecord::from).collect());
        }

        let (queued, required) = self.plan(pool.len());
        if required == 0 {
            return ThroughputOutcome::Skipped(pool.into_iter().map(RankedRecord::from).collect());
        }

        self.progress.set_length(required as u64);
        let mut records: Vec<RankedRecord> = pool.into_iter().map(RankedRecord::from).collect();
        let mut qualified = Vec::with_capacity(required);

        for record in records.iter_mut().take(queued) {
            self.progress.set_message(record.address().to_string());
            let speed = self.measurer.measure(record.address()).await;
            record.download_speed = Some(speed);

            let reached_floor = speed >= self.min_speed;
            if let Some(logger) = &self.logger {
                logger.download_measured(record.address(), speed, reached_floor).await;
            }

            if reached_floor {
                qualified.push(record.clone());
                self.progress.inc(1);
                if qualified.len() == required {
                    break;
                }
            }
        }
        self.progress.finish_and_clear();

        if qualified.is_empty() {
            ThroughputOutcome::Fallback(records)
        } else {
            ThroughputOutcome::Qualified(qualified)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::net::IpAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    const MB: f64 = 1024.0 * 1024.0;

    /// Fixed speeds per address, recording the order of measurements
    struct FakeMeasurer {
        speeds: HashMap<IpAddr, f64>,
        measured: Mutex<Vec<IpAddr>>,
    }

    impl FakeMeasurer {
        fn new(speeds: &[(u8, f64)]) -> Arc<Self> {
            Arc::new(Self {
                speeds: speeds.iter().map(|(octet, speed)| (addr(*octet), *speed)).collect(),
                measured: Mutex::new(Vec::new()),
            })
        }

        fn measured(&self) -> Vec<IpAddr> {
            self.measured.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeedMeasurer for FakeMeasurer {
        async fn measure(&self, address: IpAddr) -> f64 {
            self.measured.lock().unwrap().push(address);
            self.speeds.get(&address).copied().unwrap_or(0.0)
        }
    }

    fn addr(octet: u8) -> IpAddr {
        IpAddr::from([10, 0, 0, octet])
    }

    fn pool(octets: &[u8]) -> Vec<ProbeResult> {
        octets
            .iter()
            .map(|o| ProbeResult::new(addr(*o), 4, 4, Duration::from_millis(u64::from(*o) * 4)))
            .collect()
    }

    #[test]
    fn test_plan() {
        let measurer = FakeMeasurer::new(&[]);
        let estimator = ThroughputEstimator::new(measurer.clone(), 10, 0.0);
        assert_eq!(estimator.plan(50), (10, 10));
        assert_eq!(estimator.plan(3), (3, 3));

        let with_floor = ThroughputEstimator::new(measurer, 10, 5.0 * MB);
        assert_eq!(with_floor.plan(50), (50, 10));
        assert_eq!(with_floor.plan(4), (4, 4));
    }

    #[tokio::test]
    async fn test_disabled_skips_measurement() {
        let measurer = FakeMeasurer::new(&[(1, MB)]);
        let estimator = ThroughputEstimator::new(measurer.clone(), 10, 0.0).with_disabled(true);

        let outcome = estimator.estimate(pool(&[1, 2])).await;
        assert!(matches!(outcome, ThroughputOutcome::Skipped(ref r) if r.len() == 2));
        assert!(outcome.records().iter().all(|r| r.download_speed.is_none()));
        assert!(measurer.measured().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pool_skips() {
        let estimator = ThroughputEstimator::new(FakeMeasurer::new(&[]), 10, 0.0);
        assert_eq!(estimator.estimate(Vec::new()).await, ThroughputOutcome::Skipped(Vec::new()));
    }

    #[tokio::test]
    async fn test_no_floor_measures_first_test_count() {
        let measurer = FakeMeasurer::new(&[(1, MB), (2, 2.0 * MB), (3, 3.0 * MB)]);
        let estimator = ThroughputEstimator::new(measurer.clone(), 2, 0.0);

        let outcome = estimator.estimate(pool(&[1, 2, 3])).await;
        assert!(outcome.has_speeds());
        let addresses: Vec<_> = outcome.records().iter().map(|r| r.address()).collect();
        assert_eq!(addresses, vec![addr(1), addr(2)]);
        assert_eq!(measurer.measured(), vec![addr(1), addr(2)]);
    }

    #[tokio::test]
    async fn test_zero_speed_qualifies_without_floor() {
        let estimator = ThroughputEstimator::new(FakeMeasurer::new(&[]), 5, 0.0);
        let outcome = estimator.estimate(pool(&[1, 2])).await;

        assert!(outcome.has_speeds());
        assert_eq!(outcome.records().len(), 2);
        assert!(outcome.records().iter().all(|r| r.download_speed == Some(0.0)));
    }

    #[tokio::test]
    async fn test_floor_scans_until_enough_qualify() {
        let measurer = FakeMeasurer::new(&[(1, MB), (2, 6.0 * MB), (3, 2.0 * MB), (4, 8.0 * MB), (5, 9.0 * MB)]);
        let estimator = ThroughputEstimator::new(measurer.clone(), 2, 5.0 * MB);

        let outcome = estimator.estimate(pool(&[1, 2, 3, 4, 5])).await;
        let addresses: Vec<_> = outcome.records().iter().map(|r| r.address()).collect();
        assert_eq!(addresses, vec![addr(2), addr(4)]);
        // stops once the second candidate qualifies
        assert_eq!(measurer.measured(), vec![addr(1), addr(2), addr(3), addr(4)]);
    }

    #[tokio::test]
    async fn test_nobody_qualifies_falls_back_to_whole_pool() {
        let measurer = FakeMeasurer::new(&[(1, MB), (2, 2.0 * MB)]);
        let estimator = ThroughputEstimator::new(measurer.clone(), 10, 50.0 * MB);

        let outcome = estimator.estimate(pool(&[1, 2, 3])).await;
        let ThroughputOutcome::Fallback(records) = outcome else {
            panic!("expected fallback");
        };
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].download_speed, Some(MB));
        assert_eq!(records[2].download_speed, Some(0.0));
        assert_eq!(measurer.measured().len(), 3);
    }
}
