//! Latency probing
//!
//! A [`ProbeStrategy`] measures one candidate; [`LatencyProber`] runs a
//! strategy over every candidate in a bounded worker pool and waits for all
//! of them before returning.

pub mod http;
pub mod tcp;

pub use http::HttpProbe;
pub use tcp::TcpProbe;

use crate::models::{Candidate, ProbeResult};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};

/// Measures reachability and round-trip latency of a single candidate
///
/// Implementations never fail: attempt errors only lower `received`.
#[async_trait]
pub trait ProbeStrategy: Send + Sync {
    /// Short protocol name for logs and progress output
    fn name(&self) -> &'static str;

    /// Attempts made per candidate
    fn attempts(&self) -> u32;

    async fn probe(&self, candidate: &Candidate) -> ProbeResult;
}

/// Sent/received/delay tally shared by the strategies
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct Tally {
    pub sent: u32,
    pub received: u32,
    pub total_delay: Duration,
}

impl Tally {
    pub fn success(&mut self, elapsed: Duration) {
        self.sent += 1;
        self.received += 1;
        self.total_delay += elapsed;
    }

    pub fn failure(&mut self) {
        self.sent += 1;
    }

    pub fn finish(self, candidate: &Candidate) -> ProbeResult {
        ProbeResult::new(candidate.address, self.sent, self.received, self.total_delay)
    }
}

/// Runs a probe strategy over many candidates in parallel
pub struct LatencyProber {
    strategy: Arc<dyn ProbeStrategy>,
    concurrency: usize,
    progress: ProgressBar,
}

impl LatencyProber {
    /// Pool width is clamped to `1..=MAX_ROUTINES`
    pub fn new(strategy: Arc<dyn ProbeStrategy>, concurrency: usize) -> Self {
        Self {
            strategy,
            concurrency: concurrency.clamp(1, crate::defaults::MAX_ROUTINES),
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Probe every candidate; the result order matches the input order
    pub async fn run(&self, candidates: &[Candidate]) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (sender, mut receiver) = mpsc::channel::<(usize, ProbeResult)>(self.concurrency);
        let mut slots: Vec<Option<ProbeResult>> = vec![None; candidates.len()];
        let mut reachable = 0usize;

        let mut tasks = Vec::with_capacity(candidates.len());
        let collector = async {
            while let Some((index, result)) = receiver.recv().await {
                if result.is_reachable() {
                    reachable += 1;
                }
                self.progress.inc(1);
                self.progress.set_message(format!("reachable {}", reachable));
                slots[index] = Some(result);
            }
        };

        let dispatcher = async {
            for (index, candidate) in candidates.iter().copied().enumerate() {
                // wait for a free worker before spawning
                let Ok(permit) = semaphore.clone().acquire_owned().await else {
                    break;
                };
                let strategy = self.strategy.clone();
                let sender = sender.clone();

                tasks.push(tokio::spawn(async move {
                    let result = strategy.probe(&candidate).await;
                    drop(permit);
                    let _ = sender.send((index, result)).await;
                }));
            }
            drop(sender);
        };

        tokio::join!(dispatcher, collector);
        for task in tasks {
            let _ = task.await;
        }
        self.progress.finish();

        // a panicked worker leaves its slot empty
        let attempts = self.strategy.attempts();
        slots
            .into_iter()
            .zip(candidates)
            .map(|(slot, candidate)| slot.unwrap_or_else(|| ProbeResult::unreachable(candidate.address, attempts)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers on even last octets only, tracking peak parallelism
    struct FakeProbe {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ProbeStrategy for FakeProbe {
        fn name(&self) -> &'static str {
            "FAKE"
        }

        fn attempts(&self) -> u32 {
            4
        }

        async fn probe(&self, candidate: &Candidate) -> ProbeResult {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let IpAddr::V4(v4) = candidate.address else {
                return ProbeResult::unreachable(candidate.address, 4);
            };
            let last = v4.octets()[3];
            if last % 2 == 0 {
                ProbeResult::new(candidate.address, 4, 4, Duration::from_millis(u64::from(last) * 4))
            } else {
                ProbeResult::unreachable(candidate.address, 4)
            }
        }
    }

    fn candidates(n: u8) -> Vec<Candidate> {
        (0..n)
            .map(|i| Candidate::new(IpAddr::from([10, 0, 0, i]), 443))
            .collect()
    }

    #[tokio::test]
    async fn test_every_candidate_gets_a_result_in_input_order() {
        let strategy = Arc::new(FakeProbe {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let prober = LatencyProber::new(strategy, 8);
        let input = candidates(40);

        let results = prober.run(&input).await;
        assert_eq!(results.len(), 40);
        for (result, candidate) in results.iter().zip(&input) {
            assert_eq!(result.address, candidate.address);
            assert_eq!(result.sent, 4);
        }
        assert_eq!(results.iter().filter(|r| r.is_reachable()).count(), 20);
        assert_eq!(results[2].mean_delay(), Some(Duration::from_millis(2)));
    }

    #[tokio::test]
    async fn test_pool_width_is_respected() {
        let strategy = Arc::new(FakeProbe {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let prober = LatencyProber::new(strategy.clone(), 3);
        prober.run(&candidates(30)).await;

        let peak = strategy.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak parallelism {}", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let strategy = Arc::new(FakeProbe {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let prober = LatencyProber::new(strategy, 4);
        assert!(prober.run(&[]).await.is_empty());
    }

    #[test]
    fn test_width_clamped() {
        let strategy = Arc::new(FakeProbe {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        assert_eq!(LatencyProber::new(strategy.clone(), 0).concurrency(), 1);
        assert_eq!(LatencyProber::new(strategy, 50_000).concurrency(), 1000);
    }

    #[test]
    fn test_tally() {
        let candidate = Candidate::new(IpAddr::from([1, 1, 1, 1]), 443);
        let mut tally = Tally::default();
        tally.success(Duration::from_millis(10));
        tally.failure();
        tally.success(Duration::from_millis(30));
        let result = tally.finish(&candidate);
        assert_eq!((result.sent, result.received), (3, 2));
        assert_eq!(result.mean_delay(), Some(Duration::from_millis(20)));
    }
}
