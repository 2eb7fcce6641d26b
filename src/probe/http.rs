//! HTTP HEAD probing with status and edge-location validation

use super::{ProbeStrategy, Tally};
use crate::client::ClientFactory;
use crate::error::{AppError, Result};
use crate::logging::ProbeLogger;
use crate::models::{Candidate, ProbeResult};
use crate::types::{ColoSet, StatusPolicy};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, CONNECTION, SERVER};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Instant;

const CF_RAY: &str = "cf-ray";
const AMZ_CF_POP: &str = "x-amz-cf-pop";

/// Validates a candidate with one HEAD request, then times repeated HEADs
pub struct HttpProbe {
    attempts: u32,
    factory: ClientFactory,
    status: StatusPolicy,
    colo: Arc<ColoSet>,
    colo_pattern: Regex,
    logger: Option<ProbeLogger>,
}

impl HttpProbe {
    pub fn new(attempts: u32, factory: ClientFactory, status: StatusPolicy, colo: Arc<ColoSet>) -> Result<Self> {
        let colo_pattern = Regex::new(r"[A-Z]{3}")
            .map_err(|e| AppError::internal(format!("Invalid edge-location pattern: {}", e)))?;

        Ok(Self {
            attempts,
            factory,
            status,
            colo,
            colo_pattern,
            logger: None,
        })
    }

    pub fn with_logger(mut self, logger: ProbeLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// First request: the status must be accepted and, when an allow-set is
    /// configured, the serving location must be in it
    ///
    /// Returns the serving location, if the response names one.
    async fn validate(&self, client: &Client) -> Result<Option<String>> {
        let response = self.factory.request(client, Method::HEAD).send().await?;

        let status = response.status().as_u16();
        if !self.status.accepts(status) {
            return Err(AppError::probe(format!("status {} not accepted", status)));
        }

        let code = self.location_code(response.headers());
        if !self.colo.is_empty() {
            let code = code
                .as_ref()
                .ok_or_else(|| AppError::probe("no edge-location code in response headers"))?;
            if !self.colo.contains(code) {
                return Err(AppError::probe(format!("edge location {} not in allow-list", code)));
            }
        }

        let _ = response.bytes().await;
        Ok(code)
    }

    /// Three-letter location code from the CDN ray id or the proxy PoP header
    pub fn location_code(&self, headers: &HeaderMap) -> Option<String> {
        let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

        let is_cloudflare = header(SERVER.as_str()).is_some_and(|s| s.eq_ignore_ascii_case("cloudflare"));
        let raw = if is_cloudflare {
            header(CF_RAY)
        } else {
            header(AMZ_CF_POP).or_else(|| header(CF_RAY))
        }?;

        self.colo_pattern.find(raw).map(|m| m.as_str().to_string())
    }

    async fn timed_head(&self, client: &Client, last: bool) -> Result<std::time::Duration> {
        let mut request = self.factory.request(client, Method::HEAD);
        if last {
            request = request.header(CONNECTION, "close");
        }

        let started = Instant::now();
        let response = request.send().await?;
        let _ = response.bytes().await;
        Ok(started.elapsed())
    }

    async fn report_rejected(&self, candidate: &Candidate, error: &AppError) -> ProbeResult {
        if let Some(logger) = &self.logger {
            logger.rejected(candidate.address, error).await;
        }
        ProbeResult::unreachable(candidate.address, self.attempts)
    }
}

#[async_trait]
impl ProbeStrategy for HttpProbe {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }

    async fn probe(&self, candidate: &Candidate) -> ProbeResult {
        let client = match self.factory.probe_client(candidate.address) {
            Ok(client) => client,
            Err(error) => return self.report_rejected(candidate, &error).await,
        };

        let location = match self.validate(&client).await {
            Ok(location) => location,
            Err(error) => return self.report_rejected(candidate, &error).await,
        };

        let mut tally = Tally::default();
        for attempt in 1..=self.attempts {
            match self.timed_head(&client, attempt == self.attempts).await {
                Ok(elapsed) => tally.success(elapsed),
                Err(error) => {
                    tally.failure();
                    if let Some(logger) = &self.logger {
                        logger.attempt_failed(candidate.address, attempt, &error).await;
                    }
                }
            }
        }

        let result = tally.finish(candidate).with_location(location);
        if let Some(logger) = &self.logger {
            logger.probed(&result).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use reqwest::header::HeaderValue;
    use std::time::Duration;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn probe_for(server: &MockServer, status: StatusPolicy, colo: &str) -> (HttpProbe, Candidate) {
        let port = server.address().port();
        let mut config = Config::default();
        config.test_url = format!("http://localhost:{}/cdn-cgi/trace", port);
        config.tcp_port = port;

        let factory = ClientFactory::new(&config).unwrap();
        let colo = Arc::new(colo.parse::<ColoSet>().unwrap());
        let probe = HttpProbe::new(4, factory, status, colo).unwrap();
        (probe, Candidate::new("127.0.0.1".parse().unwrap(), port))
    }

    async fn mount_head(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("HEAD"))
            .and(path("/cdn-cgi/trace"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_accepted_status_counts_every_attempt() {
        let server = MockServer::start().await;
        mount_head(&server, ResponseTemplate::new(200)).await;

        let (probe, candidate) = probe_for(&server, StatusPolicy::Default, "").await;
        let result = probe.probe(&candidate).await;

        assert_eq!(result.sent, 4);
        assert_eq!(result.received, 4);
        assert!(result.mean_delay().is_some());

        // validation request plus four timed requests
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 5);
        assert_eq!(
            requests[4].headers.get("connection").map(|v| v.to_str().unwrap().to_ascii_lowercase()),
            Some("close".to_string())
        );
    }

    #[tokio::test]
    async fn test_redirect_status_accepted_by_default() {
        let server = MockServer::start().await;
        mount_head(
            &server,
            ResponseTemplate::new(301).insert_header("Location", "http://localhost:1/elsewhere"),
        )
        .await;

        let (probe, candidate) = probe_for(&server, StatusPolicy::Default, "").await;
        let result = probe.probe(&candidate).await;
        assert_eq!(result.received, 4);
    }

    #[tokio::test]
    async fn test_rejected_status_yields_total_loss() {
        let server = MockServer::start().await;
        mount_head(&server, ResponseTemplate::new(403)).await;

        let (probe, candidate) = probe_for(&server, StatusPolicy::Default, "").await;
        let result = probe.probe(&candidate).await;

        assert_eq!(result.sent, 4);
        assert_eq!(result.received, 0);
        assert_eq!(result.loss_rate(), 1.0);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exact_status_policy() {
        let server = MockServer::start().await;
        mount_head(&server, ResponseTemplate::new(200)).await;

        let (probe, candidate) = probe_for(&server, StatusPolicy::Exact(204), "").await;
        assert_eq!(probe.probe(&candidate).await.received, 0);
    }

    #[tokio::test]
    async fn test_edge_location_allow_list() {
        let server = MockServer::start().await;
        mount_head(
            &server,
            ResponseTemplate::new(200)
                .insert_header("Server", "cloudflare")
                .insert_header("CF-RAY", "7bd32409eda7b020-SJC"),
        )
        .await;

        let (allowed, candidate) = probe_for(&server, StatusPolicy::Default, "sjc,lax").await;
        let result = allowed.probe(&candidate).await;
        assert_eq!(result.received, 4);
        assert_eq!(result.location.as_deref(), Some("SJC"));

        let (denied, candidate) = probe_for(&server, StatusPolicy::Default, "HKG").await;
        assert_eq!(denied.probe(&candidate).await.received, 0);
    }

    #[tokio::test]
    async fn test_location_kept_without_allow_list() {
        let server = MockServer::start().await;
        mount_head(
            &server,
            ResponseTemplate::new(200)
                .insert_header("Server", "cloudflare")
                .insert_header("CF-RAY", "7bd32409eda7b020-HKG"),
        )
        .await;

        let (probe, candidate) = probe_for(&server, StatusPolicy::Default, "").await;
        assert_eq!(probe.probe(&candidate).await.location.as_deref(), Some("HKG"));
    }

    #[tokio::test]
    async fn test_missing_location_header_rejected_only_with_allow_list() {
        let server = MockServer::start().await;
        mount_head(&server, ResponseTemplate::new(200)).await;

        let (probe, candidate) = probe_for(&server, StatusPolicy::Default, "SJC").await;
        assert_eq!(probe.probe(&candidate).await.received, 0);

        let (probe, candidate) = probe_for(&server, StatusPolicy::Default, "").await;
        let result = probe.probe(&candidate).await;
        assert_eq!(result.received, 4);
        assert_eq!(result.location, None);
    }

    #[tokio::test]
    async fn test_unreachable_candidate() {
        let server = MockServer::start().await;
        let (probe, _) = probe_for(&server, StatusPolicy::Default, "").await;
        let probe = HttpProbe {
            factory: probe.factory.clone().with_probe_timeout(Duration::from_millis(300)),
            ..probe
        };

        // TEST-NET-1 addresses never answer
        let candidate = Candidate::new("192.0.2.1".parse().unwrap(), 9);
        let result = probe.probe(&candidate).await;
        assert_eq!(result.received, 0);
        assert_eq!(result.sent, 4);
    }

    #[tokio::test]
    async fn test_ip_literal_url_still_targets_candidate() {
        let server = MockServer::start().await;
        mount_head(&server, ResponseTemplate::new(200)).await;
        let port = server.address().port();

        let mut config = Config::default();
        config.test_url = format!("http://127.0.0.1:{}/cdn-cgi/trace", port);
        config.tcp_port = port;
        let factory = ClientFactory::new(&config)
            .unwrap()
            .with_probe_timeout(Duration::from_millis(300));
        let probe = HttpProbe::new(4, factory, StatusPolicy::Default, Arc::new(ColoSet::default())).unwrap();

        // the URL's own address is live; the candidate is TEST-NET-1
        let unreachable = Candidate::new("192.0.2.1".parse().unwrap(), port);
        let result = probe.probe(&unreachable).await;
        assert_eq!(result.sent, 4);
        assert_eq!(result.received, 0);
        assert!(server.received_requests().await.unwrap().is_empty());

        let reachable = Candidate::new("127.0.0.1".parse().unwrap(), port);
        assert_eq!(probe.probe(&reachable).await.received, 4);
    }

    #[test]
    fn test_location_code_extraction() {
        let probe = HttpProbe::new(
            1,
            ClientFactory::new(&Config::default()).unwrap(),
            StatusPolicy::Default,
            Arc::new(ColoSet::default()),
        )
        .unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("cloudflare"));
        headers.insert("cf-ray", HeaderValue::from_static("7bd32409eda7b020-SJC"));
        assert_eq!(probe.location_code(&headers), Some("SJC".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("CloudFront"));
        headers.insert("x-amz-cf-pop", HeaderValue::from_static("SIN52-P1"));
        assert_eq!(probe.location_code(&headers), Some("SIN".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert("server", HeaderValue::from_static("nginx"));
        assert_eq!(probe.location_code(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("cf-ray", HeaderValue::from_static("lowercase-only"));
        assert_eq!(probe.location_code(&headers), None);
    }
}
