//! Type definitions and aliases

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Address family of a parsed block, fixed at parse time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// Latency probing protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeMode {
    /// Time raw TCP connects
    Tcp,
    /// Validate with HEAD, then time repeated HEAD requests
    Http,
}

impl ProbeMode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Http => "HTTP",
        }
    }
}

/// Status codes accepted by the HTTP validation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusPolicy {
    /// 200, 301 or 302
    Default,
    /// Only this exact code
    Exact(u16),
}

impl StatusPolicy {
    pub const DEFAULT_ACCEPTED: [u16; 3] = [200, 301, 302];

    /// Build from the configured code, where 0 means "use the default set"
    pub fn from_code(code: u16) -> Self {
        if code == 0 {
            Self::Default
        } else {
            Self::Exact(code)
        }
    }

    pub fn accepts(&self, status: u16) -> bool {
        match self {
            Self::Default => Self::DEFAULT_ACCEPTED.contains(&status),
            Self::Exact(code) => *code == status,
        }
    }
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::Default
    }
}

/// Immutable allow-set of 3-letter edge-location codes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoSet {
    codes: HashSet<String>,
}

impl ColoSet {
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Sorted codes, for display and serialization round-trips
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.codes.iter().cloned().collect();
        codes.sort();
        codes
    }
}

impl FromStr for ColoSet {
    type Err = AppError;

    /// Parses a comma-separated list, upper-casing each code
    fn from_str(s: &str) -> Result<Self> {
        let mut codes = HashSet::new();
        for raw in s.split(',') {
            let code = raw.trim().to_uppercase();
            if code.is_empty() {
                continue;
            }
            if !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(AppError::validation(format!(
                    "Invalid edge-location code '{}': expected letters only",
                    raw.trim()
                )));
            }
            codes.insert(code);
        }
        Ok(Self { codes })
    }
}

impl fmt::Display for ColoSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codes().join(","))
    }
}
