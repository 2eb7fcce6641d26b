//! Edge-location directory
//!
//! Maps the three-letter location codes reported by edge nodes to a region
//! and city. The directory is a JSON array cached on disk; when the file is
//! missing it is downloaded once from the configured source and saved.

use crate::error::{AppError, ErrorContext, Result};
use crate::models::{EdgeSite, RankedRecord};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// One directory entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub iata: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub cca2: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub city: String,
}

/// Where a directory came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorySource {
    Cache,
    Downloaded,
}

/// Location codes indexed for lookup
#[derive(Debug, Clone, Default)]
pub struct LocationDirectory {
    by_code: HashMap<String, Location>,
}

impl LocationDirectory {
    /// Parse a JSON array of locations; later duplicates win
    pub fn from_json(body: &str) -> Result<Self> {
        let locations: Vec<Location> = serde_json::from_str(body)?;
        Ok(locations.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, code: &str) -> Option<&Location> {
        self.by_code.get(&code.to_ascii_uppercase())
    }

    /// Attach region and city to every record whose code is known
    ///
    /// Returns how many records were annotated.
    pub fn annotate(&self, records: &mut [RankedRecord]) -> usize {
        let mut annotated = 0;
        for record in records.iter_mut() {
            let Some(location) = record.location_code().and_then(|code| self.lookup(code)) else {
                continue;
            };
            record.site = Some(EdgeSite {
                region: location.region.clone(),
                city: location.city.clone(),
            });
            annotated += 1;
        }
        annotated
    }

    /// Read the cached directory, downloading and caching it first if missing
    pub async fn load_or_fetch(path: &Path, source: &str) -> Result<(Self, DirectorySource)> {
        if path.exists() {
            let body = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read location directory {}", path.display()))?;
            let directory = Self::from_json(&body)
                .with_context(|| format!("Invalid location directory {}", path.display()))?;
            return Ok((directory, DirectorySource::Cache));
        }

        let body = fetch(source).await?;
        let directory = Self::from_json(&body)?;
        std::fs::write(path, &body)
            .with_context(|| format!("Cannot cache location directory at {}", path.display()))?;
        Ok((directory, DirectorySource::Downloaded))
    }
}

impl FromIterator<Location> for LocationDirectory {
    fn from_iter<I: IntoIterator<Item = Location>>(iter: I) -> Self {
        let by_code = iter
            .into_iter()
            .map(|location| (location.iata.to_ascii_uppercase(), location))
            .collect();
        Self { by_code }
    }
}

async fn fetch(source: &str) -> Result<String> {
    let client = Client::builder()
        .timeout(FETCH_TIMEOUT)
        .user_agent(crate::defaults::USER_AGENT)
        .build()
        .map_err(|e| AppError::internal(format!("Failed to create directory client: {}", e)))?;

    let response = client
        .get(source)
        .send()
        .await
        .map_err(|e| AppError::network(format!("Location directory download failed: {}", e)))?;

    if response.status() != StatusCode::OK {
        return Err(AppError::http_request(format!(
            "Location directory source returned HTTP {}",
            response.status()
        )));
    }

    Ok(response.text().await?)
}
