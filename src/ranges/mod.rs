//! IP range parsing and candidate expansion

pub mod loader;
pub mod sampler;

pub use loader::{load_candidates, read_tokens};
pub use sampler::{CandidateSampler, SamplingPolicy};

use crate::types::{AddressFamily, AppError, Result};
use ipnet::IpNet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// A parsed IP block with its first (network) address and mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBlock {
    net: IpNet,
}

impl AddressBlock {
    /// Parse a bare address (full-width mask) or CIDR token
    pub fn parse(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::parse("Empty IP range token"));
        }

        let net = if token.contains('/') {
            IpNet::from_str(token)
                .map_err(|e| AppError::parse(format!("Invalid CIDR '{}': {}", token, e)))?
        } else {
            let addr = IpAddr::from_str(token)
                .map_err(|e| AppError::parse(format!("Invalid IP address '{}': {}", token, e)))?;
            IpNet::from(addr)
        };

        Ok(Self { net: net.trunc() })
    }

    pub fn first_address(&self) -> IpAddr {
        self.net.network()
    }

    pub fn mask(&self) -> IpAddr {
        self.net.netmask()
    }

    pub fn prefix_len(&self) -> u8 {
        self.net.prefix_len()
    }

    pub fn family(&self) -> AddressFamily {
        match self.net {
            IpNet::V4(_) => AddressFamily::V4,
            IpNet::V6(_) => AddressFamily::V6,
        }
    }

    /// True for /32 and /128 blocks
    pub fn is_single_host(&self) -> bool {
        self.net.prefix_len() == self.net.max_prefix_len()
    }

    pub fn contains(&self, addr: &IpAddr) -> bool {
        self.net.contains(addr)
    }

    pub fn net(&self) -> &IpNet {
        &self.net
    }
}

impl FromStr for AddressBlock {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.net)
    }
}
