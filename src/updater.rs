//! Latest-release check against the GitHub releases API
//!
//! The release source is the `UPDATE_URL` environment variable when set,
//! otherwise the `releases/latest` endpoint derived from the package's
//! repository URL.

use crate::{AppError, Result};
use reqwest::{Client, StatusCode};
use semver::Version;
use serde::Deserialize;
use std::time::Duration;

/// Timeout for the release lookup
const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

const GITHUB_API_BASE: &str = "https://api.github.com";

/// The fields of a GitHub release this tool reads
#[derive(Debug, Clone, Deserialize)]
struct GitHubRelease {
    tag_name: String,
    html_url: Option<String>,
    #[serde(default)]
    prerelease: bool,
    #[serde(default)]
    draft: bool,
}

/// Outcome of an update check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// A newer release is published
    Available {
        current: Version,
        latest: Version,
        url: Option<String>,
    },
    /// Running the latest (or a newer, unreleased) version
    UpToDate { current: Version },
}

impl UpdateStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    /// One-line summary for the console
    pub fn message(&self) -> String {
        match self {
            Self::Available { current, latest, url } => {
                let mut message = format!("New version {} available (current {})", latest, current);
                if let Some(url) = url {
                    message.push_str(&format!(": {}", url));
                }
                message
            }
            Self::UpToDate { current } => format!("Already on the latest version {}", current),
        }
    }
}

/// Looks up the latest published release
pub struct UpdateChecker {
    client: Client,
    releases_url: String,
    current: Version,
}

impl UpdateChecker {
    /// Checker for this build, using `UPDATE_URL` or the package repository
    pub fn new() -> Result<Self> {
        let releases_url = match std::env::var("UPDATE_URL") {
            Ok(url) if !url.trim().is_empty() => url.trim().to_string(),
            _ => releases_url_for(env!("CARGO_PKG_REPOSITORY")).ok_or_else(|| {
                AppError::config("No release source known for this build; set UPDATE_URL")
            })?,
        };
        Self::with_url(releases_url, crate::VERSION)
    }

    /// Checker against an explicit endpoint and current version
    pub fn with_url(releases_url: impl Into<String>, current: &str) -> Result<Self> {
        let current = parse_version(current)?;
        let client = Client::builder()
            .timeout(UPDATE_TIMEOUT)
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::network(format!("Failed to create update client: {}", e)))?;

        Ok(Self {
            client,
            releases_url: releases_url.into(),
            current,
        })
    }

    pub fn releases_url(&self) -> &str {
        &self.releases_url
    }

    /// Fetch the latest release and compare it with the running version
    pub async fn check(&self) -> Result<UpdateStatus> {
        let response = self
            .client
            .get(&self.releases_url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| AppError::network(format!("Update check failed: {}", e)))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                return Err(AppError::http_request("No published release found"));
            }
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                return Err(AppError::http_request("GitHub API rate limit exceeded, try again later"));
            }
            status => {
                return Err(AppError::http_request(format!("Update check returned HTTP {}", status)));
            }
        }

        let release: GitHubRelease = response
            .json()
            .await
            .map_err(|e| AppError::parse(format!("Failed to parse release response: {}", e)))?;

        if release.draft || release.prerelease {
            return Ok(UpdateStatus::UpToDate {
                current: self.current.clone(),
            });
        }

        let latest = parse_version(&release.tag_name)?;
        if latest > self.current {
            Ok(UpdateStatus::Available {
                current: self.current.clone(),
                latest,
                url: release.html_url,
            })
        } else {
            Ok(UpdateStatus::UpToDate {
                current: self.current.clone(),
            })
        }
    }
}

/// Parse a release tag such as `v1.2.3`
fn parse_version(tag: &str) -> Result<Version> {
    let trimmed = tag.trim();
    let bare = trimmed.strip_prefix('v').or_else(|| trimmed.strip_prefix('V')).unwrap_or(trimmed);
    Version::parse(bare).map_err(|e| AppError::parse(format!("Invalid version '{}': {}", tag, e)))
}

/// `https://github.com/owner/repo` to its `releases/latest` API endpoint
fn releases_url_for(repository: &str) -> Option<String> {
    let url = url::Url::parse(repository.trim()).ok()?;
    if url.host_str()? != "github.com" {
        return None;
    }

    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?.trim_end_matches(".git");
    Some(format!("{}/repos/{}/{}/releases/latest", GITHUB_API_BASE, owner, repo))
}
