//! Data models for the edge IP tester

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::Config;
pub use metrics::{Candidate, EdgeSite, ProbeResult, RankedRecord};
