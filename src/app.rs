//! Main application orchestration and execution

use crate::{
    client::ClientFactory,
    download::{HttpSpeedMeasurer, ThroughputEstimator},
    error::Result,
    locations::{DirectorySource, LocationDirectory},
    log_debug, log_warn,
    logging::{Logger, LoggerFactory},
    models::{Candidate, Config, ProbeResult, RankedRecord},
    output::{create_progress_bar, reporters_for},
    probe::{HttpProbe, LatencyProber, ProbeStrategy, TcpProbe},
    ranges::{load_candidates, CandidateSampler, SamplingPolicy},
    ranking::{Ranker, ResultFilter},
};
use std::sync::Arc;

/// Runs the pipeline: expand ranges, probe, filter, download, rank, report
pub struct App {
    config: Config,
    loggers: LoggerFactory,
}

impl App {
    pub fn new(config: Config) -> Self {
        let loggers = LoggerFactory::new(config.clone());
        Self { config, loggers }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every phase and hand the ranked records to the reporters
    pub async fn run(&self) -> Result<Vec<RankedRecord>> {
        let result = self.run_and_report().await;

        // structured copy of the failure for debug runs; main prints the user-facing one
        if let (Err(err), true) = (&result, self.config.debug) {
            let logger = self.loggers.create_error_logger().await;
            logger.log_error(err, Some("run aborted")).await;
        }

        result
    }

    async fn run_and_report(&self) -> Result<Vec<RankedRecord>> {
        let records = self.collect().await?;

        for reporter in reporters_for(&self.config) {
            reporter.report(&records)?;
        }

        Ok(records)
    }

    /// Run every phase without reporting
    pub async fn collect(&self) -> Result<Vec<RankedRecord>> {
        let mut phases = self.loggers.create_phase_logger().await;
        let logger = self.loggers.create_logger("APP").await;

        phases.start("expansion", 0).await;
        let candidates = self.expand()?;
        phases.finish("expansion", candidates.len()).await;
        if candidates.is_empty() {
            log_warn!(logger, "Input produced no candidate addresses");
        }

        phases.start("latency", candidates.len()).await;
        let probed = self.probe(&candidates).await?;
        phases.finish("latency", probed.len()).await;

        phases.start("filter", probed.len()).await;
        let probed_count = probed.len();
        let pool = ResultFilter::from_config(&self.config).apply(probed);
        phases.finish("filter", pool.len()).await;
        log_debug!(logger, "{} of {} candidates passed the loss and delay filters", pool.len(), probed_count);

        phases.start("download", pool.len()).await;
        let outcome = self.estimate(pool).await?;
        phases.finish("download", outcome.records().len()).await;

        let mut records = Ranker::new().rank(outcome);
        self.locate(&mut records, &logger).await;
        Ok(records)
    }

    /// Add region and city from the location directory; a missing directory
    /// leaves the records as they are
    async fn locate(&self, records: &mut [RankedRecord], logger: &Logger) {
        let Some(path) = self.config.locations_path() else {
            return;
        };
        if records.iter().all(|r| r.location_code().is_none()) {
            return;
        }

        match LocationDirectory::load_or_fetch(std::path::Path::new(path), &self.config.locations_url).await {
            Ok((directory, source)) => {
                if source == DirectorySource::Downloaded {
                    log_debug!(logger, "Saved location directory to {}", path);
                }
                let annotated = directory.annotate(records);
                log_debug!(logger, "{} of {} results matched a known location", annotated, records.len());
            }
            Err(err) => {
                log_warn!(logger, "Location lookup skipped: {}", err);
            }
        }
    }

    fn expand(&self) -> Result<Vec<Candidate>> {
        let policy = SamplingPolicy::from_all_ip(self.config.all_ip);
        let mut sampler = match self.config.seed {
            Some(seed) => CandidateSampler::with_seed(policy, self.config.tcp_port, seed),
            None => CandidateSampler::new(policy, self.config.tcp_port),
        };
        load_candidates(&self.config, &mut sampler)
    }

    async fn probe(&self, candidates: &[Candidate]) -> Result<Vec<ProbeResult>> {
        let logger = self.loggers.create_probe_logger().await;
        let strategy: Arc<dyn ProbeStrategy> = if self.config.httping {
            let factory = ClientFactory::new(&self.config)?;
            Arc::new(
                HttpProbe::new(
                    self.config.ping_times,
                    factory,
                    self.config.status_policy(),
                    Arc::new(self.config.colo.clone()),
                )?
                .with_logger(logger),
            )
        } else {
            Arc::new(TcpProbe::new(self.config.ping_times).with_logger(logger))
        };

        println!(
            "# Edge IP Tester {}\n\nLatency test ({}, port {}, delay {} ~ {} ms, loss {:.2})",
            crate::VERSION,
            strategy.name(),
            self.config.tcp_port,
            self.config.min_delay_ms,
            self.config.max_delay_ms,
            self.config.max_loss_rate
        );

        let progress = create_progress_bar(candidates.len() as u64, "latency", self.show_progress());
        let prober = LatencyProber::new(strategy, self.config.effective_routines()).with_progress(progress);
        Ok(prober.run(candidates).await)
    }

    async fn estimate(&self, pool: Vec<ProbeResult>) -> Result<crate::download::ThroughputOutcome> {
        let logger = self.loggers.create_probe_logger().await;
        let factory = ClientFactory::new(&self.config)?;
        let measurer = HttpSpeedMeasurer::new(factory, self.config.download_time()).with_logger(logger.clone());

        let estimator = ThroughputEstimator::from_config(Arc::new(measurer), &self.config).with_logger(logger);
        if !self.config.disable_download && !pool.is_empty() {
            let (queued, required) = estimator.plan(pool.len());
            println!(
                "Download test (floor {:.2} MB/s, need {}, queue {})",
                self.config.min_speed_mb, required, queued
            );
        }

        let progress = create_progress_bar(0, "download", self.show_progress() && !self.config.disable_download);
        Ok(estimator.with_progress(progress).estimate(pool).await)
    }

    fn show_progress(&self) -> bool {
        self.config.print_num > 0
    }
}

/// Block until Enter is pressed so a double-clicked console stays open
pub fn wait_for_exit(config: &Config) {
    if config.print_num == 0 || !cfg!(windows) {
        return;
    }

    print!("Press Enter or Ctrl+C to exit.");
    let _ = std::io::Write::flush(&mut std::io::stdout());
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
}
