//! Loss-rate and delay-window filters over latency-sorted results

use crate::defaults::{DEFAULT_MAX_DELAY, DEFAULT_MAX_LOSS_RATE, DEFAULT_MIN_DELAY};
use crate::models::{Config, ProbeResult};
use std::cmp::Ordering;
use std::time::Duration;

/// Undefined delays compare greater than any measured delay
pub(crate) fn compare_delay(a: Option<Duration>, b: Option<Duration>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort by loss rate, then mean delay
pub fn sort_by_loss_then_delay(results: &mut [ProbeResult]) {
    results.sort_by(|a, b| {
        a.loss_rate()
            .total_cmp(&b.loss_rate())
            .then_with(|| compare_delay(a.mean_delay(), b.mean_delay()))
    });
}

/// Keep results up to the first one above `max_loss`
///
/// Expects input sorted by loss rate. A bound of 1.0 or more keeps everything.
pub fn filter_loss(results: Vec<ProbeResult>, max_loss: f32) -> Vec<ProbeResult> {
    if max_loss >= DEFAULT_MAX_LOSS_RATE {
        return results;
    }

    results
        .into_iter()
        .take_while(|result| result.loss_rate() <= max_loss)
        .collect()
}

/// Keep results whose mean delay lies in `min..=max`
///
/// Scanning stops at the first delay above `max`; delays below `min` are
/// skipped. The default window, or any `max` beyond it, keeps everything.
pub fn filter_delay(results: Vec<ProbeResult>, min: Duration, max: Duration) -> Vec<ProbeResult> {
    if max > DEFAULT_MAX_DELAY || (max == DEFAULT_MAX_DELAY && min == DEFAULT_MIN_DELAY) {
        return results;
    }

    let mut kept = Vec::with_capacity(results.len());
    for result in results {
        let Some(delay) = result.mean_delay() else {
            break;
        };
        if delay > max {
            break;
        }
        if delay < min {
            continue;
        }
        kept.push(result);
    }
    kept
}

/// Thresholds applied between the latency and throughput phases
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultFilter {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub max_loss: f32,
}

impl Default for ResultFilter {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_loss: DEFAULT_MAX_LOSS_RATE,
        }
    }
}

impl ResultFilter {
    pub fn from_config(config: &Config) -> Self {
        Self {
            min_delay: config.min_delay(),
            max_delay: config.max_delay(),
            max_loss: config.max_loss_rate,
        }
    }

    /// Sort, then drop lossy results, then results outside the delay window
    pub fn apply(&self, mut results: Vec<ProbeResult>) -> Vec<ProbeResult> {
        sort_by_loss_then_delay(&mut results);
        let results = filter_loss(results, self.max_loss);
        filter_delay(results, self.min_delay, self.max_delay)
    }
}
