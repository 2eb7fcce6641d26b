//! Download speed measurement over a pinned HTTP client

use super::meter::{measure_stream, Measurement, StopReason};
use crate::client::ClientFactory;
use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use std::net::IpAddr;
use std::time::Duration;

/// Measures sustained download speed from one address, in bytes per second
///
/// Failures never surface: an address that cannot serve the test resource
/// measures as zero.
#[async_trait]
pub trait SpeedMeasurer: Send + Sync {
    async fn measure(&self, address: IpAddr) -> f64;
}

/// GETs the test resource through a client pinned to the address under test
pub struct HttpSpeedMeasurer {
    factory: ClientFactory,
    budget: Duration,
    logger: Option<ProbeLogger>,
}

impl HttpSpeedMeasurer {
    pub fn new(factory: ClientFactory, budget: Duration) -> Self {
        Self {
            factory,
            budget,
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    async fn download(&self, address: IpAddr) -> Result<Measurement> {
        let client = self.factory.download_client(address)?;
        let response = self.factory.request(&client, Method::GET).send().await?;

        if response.status() != StatusCode::OK {
            return Err(AppError::http_request(format!(
                "download returned status {}",
                response.status().as_u16()
            )));
        }

        let content_length = response.content_length();
        Ok(measure_stream(Box::pin(response.bytes_stream()), content_length, self.budget).await)
    }
}

#[async_trait]
impl SpeedMeasurer for HttpSpeedMeasurer {
    async fn measure(&self, address: IpAddr) -> f64 {
        match self.download(address).await {
            Ok(measurement) => {
                if measurement.reason == StopReason::ReadError {
                    if let Some(logger) = &self.logger {
                        let error = AppError::stream(format!(
                            "body read failed after {} bytes",
                            measurement.bytes_read
                        ));
                        logger.attempt_failed(address, 1, &error).await;
                    }
                }
                measurement.speed
            }
            Err(error) => {
                if let Some(logger) = &self.logger {
                    logger.rejected(address, &error).await;
                }
                0.0
            }
        }
    }
}
