//! TCP connect timing

use super::{ProbeStrategy, Tally};
use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use crate::models::{Candidate, ProbeResult};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Times fresh TCP connections to the candidate
pub struct TcpProbe {
    attempts: u32,
    connect_timeout: Duration,
    logger: Option<ProbeLogger>,
}

impl TcpProbe {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            connect_timeout: crate::defaults::TCP_CONNECT_TIMEOUT,
            logger: None,
        }
    }

    pub fn with_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// One connect; the stream is dropped (closed) right after
    async fn connect_once(&self, candidate: &Candidate) -> Result<Duration> {
        let started = Instant::now();
        match timeout(self.connect_timeout, TcpStream::connect(candidate.socket_addr())).await {
            Ok(Ok(_stream)) => Ok(started.elapsed()),
            Ok(Err(e)) => Err(AppError::network(format!("connect to {} failed: {}", candidate, e))),
            Err(_) => Err(AppError::timeout(format!(
                "connect to {} exceeded {}ms",
                candidate,
                self.connect_timeout.as_millis()
            ))),
        }
    }
}

#[async_trait]
impl ProbeStrategy for TcpProbe {
    fn name(&self) -> &'static str {
        "TCP"
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }

    async fn probe(&self, candidate: &Candidate) -> ProbeResult {
        let mut tally = Tally::default();

        for attempt in 1..=self.attempts {
            match self.connect_once(candidate).await {
                Ok(elapsed) => tally.success(elapsed),
                Err(error) => {
                    tally.failure();
                    if let Some(logger) = &self.logger {
                        logger.attempt_failed(candidate.address, attempt, &error).await;
                    }
                }
            }
        }

        let result = tally.finish(candidate);
        if let Some(logger) = &self.logger {
            logger.probed(&result).await;
        }
        result
    }
}
