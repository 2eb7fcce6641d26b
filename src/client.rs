//! HTTP clients pinned to a single candidate address
//!
//! Every host name the client would resolve (including redirect targets) maps
//! to the candidate, so requests keep the test URL's Host header and TLS name
//! while the TCP connection goes to the address under test.
//!
//! A test URL whose host is an IP literal never reaches a resolver, so its
//! host is swapped for [`PINNED_HOST`] and the literal travels in the Host
//! header instead.

use crate::error::{AppError, Result};
use crate::models::Config;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderValue, HOST};
use reqwest::{redirect, Client, Method, RequestBuilder, Url};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use url::Host;

/// Stand-in host name for test URLs addressed by IP literal
pub const PINNED_HOST: &str = "pinned.edge.invalid";

/// Resolver that answers every lookup with one fixed address
#[derive(Debug, Clone, Copy)]
pub struct PinnedResolver {
    address: IpAddr,
}

impl PinnedResolver {
    pub fn new(address: IpAddr) -> Self {
        Self { address }
    }
}

impl Resolve for PinnedResolver {
    fn resolve(&self, _name: Name) -> Resolving {
        // port is replaced by the connector with the URL's port
        let addr = SocketAddr::new(self.address, 0);
        Box::pin(futures::future::ready(Ok(Box::new(std::iter::once(addr)) as Addrs)))
    }
}

/// Builds per-candidate clients for probing and downloading
#[derive(Debug, Clone)]
pub struct ClientFactory {
    target: Url,
    host_header: Option<HeaderValue>,
    probe_timeout: Duration,
    download_timeout: Duration,
    strip_referer: bool,
}

impl ClientFactory {
    pub fn new(config: &Config) -> Result<Self> {
        let url = Url::parse(&config.test_url)?;
        let (target, host_header) = route_through_resolver(pinned_url(&url, config.tcp_port)?)?;
        Ok(Self {
            target,
            host_header,
            probe_timeout: crate::defaults::HTTP_PROBE_TIMEOUT,
            download_timeout: config.download_time(),
            strip_referer: config.uses_default_url(),
        })
    }

    /// Override the probe request timeout
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Test URL with its port set to the configured test port
    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Request for the test URL, carrying the original Host when it was rewritten
    pub fn request(&self, client: &Client, method: Method) -> RequestBuilder {
        let request = client.request(method, self.target.clone());
        match &self.host_header {
            Some(host) => request.header(HOST, host.clone()),
            None => request,
        }
    }

    /// Client for HEAD probing: no redirects, short timeout
    pub fn probe_client(&self, address: IpAddr) -> Result<Client> {
        base_builder(address)
            .timeout(self.probe_timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create probe client: {}", e)))
    }

    /// Client for the download phase: bounded redirects, whole-request budget
    pub fn download_client(&self, address: IpAddr) -> Result<Client> {
        base_builder(address)
            .timeout(self.download_timeout)
            .redirect(redirect::Policy::limited(crate::defaults::MAX_DOWNLOAD_REDIRECTS))
            .referer(!self.strip_referer)
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create download client: {}", e)))
    }
}

fn base_builder(address: IpAddr) -> reqwest::ClientBuilder {
    Client::builder()
        .dns_resolver(Arc::new(PinnedResolver::new(address)))
        .connect_timeout(crate::defaults::TCP_CONNECT_TIMEOUT)
        .user_agent(crate::defaults::USER_AGENT)
}

/// Point the URL at the test port, leaving it untouched when it already matches
pub fn pinned_url(url: &Url, port: u16) -> Result<Url> {
    let mut pinned = url.clone();
    if pinned.port_or_known_default() != Some(port) {
        pinned
            .set_port(Some(port))
            .map_err(|_| AppError::validation(format!("Cannot set port {} on URL {}", port, url)))?;
    }
    Ok(pinned)
}

/// Swap an IP-literal host for [`PINNED_HOST`], returning the Host header to send
fn route_through_resolver(url: Url) -> Result<(Url, Option<HeaderValue>)> {
    let authority = match url.host() {
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Ok((url, None)),
        },
        _ => return Ok((url, None)),
    };

    let header = HeaderValue::from_str(&authority)
        .map_err(|e| AppError::internal(format!("Invalid Host header '{}': {}", authority, e)))?;
    let mut rewritten = url;
    rewritten
        .set_host(Some(PINNED_HOST))
        .map_err(|e| AppError::internal(format!("Cannot rewrite test URL host: {}", e)))?;
    Ok((rewritten, Some(header)))
}
