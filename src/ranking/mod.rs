//! Filtering and final ordering of results

pub mod filter;

pub use filter::{filter_delay, filter_loss, sort_by_loss_then_delay, ResultFilter};

use crate::download::ThroughputOutcome;
use crate::models::RankedRecord;
use filter::compare_delay;

/// Produces the final ordering of ranked records
#[derive(Debug, Default, Clone, Copy)]
pub struct Ranker;

impl Ranker {
    pub fn new() -> Self {
        Self
    }

    /// Speed order when throughput results exist, delay order otherwise
    pub fn rank(&self, outcome: ThroughputOutcome) -> Vec<RankedRecord> {
        let by_speed = outcome.has_speeds();
        let mut records = outcome.into_records();
        if by_speed {
            sort_by_speed(&mut records);
        } else {
            sort_by_delay(&mut records);
        }
        records
    }
}

/// Fastest first; stable for equal speeds
pub fn sort_by_speed(records: &mut [RankedRecord]) {
    records.sort_by(|a, b| {
        let a = a.download_speed.unwrap_or(0.0);
        let b = b.download_speed.unwrap_or(0.0);
        b.total_cmp(&a)
    });
}

/// Lowest mean delay first, ties broken by loss rate; stable
pub fn sort_by_delay(records: &mut [RankedRecord]) {
    records.sort_by(|a, b| {
        compare_delay(a.probe.mean_delay(), b.probe.mean_delay())
            .then_with(|| a.probe.loss_rate().total_cmp(&b.probe.loss_rate()))
    });
}
