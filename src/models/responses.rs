//! Response DTOs for the peer and admin API
//!
//! Defines the JSON bodies a node sends back. Value reads are raw bytes and
//! have no DTO.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

/// Response body for DELETE /_groupcache/:group/:key
///
/// Also parsed by the peer client, so it round-trips through serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub group: String,
    pub key: String,
    /// Whether the owning node reported the key as deleted
    pub deleted: bool,
}

impl DeleteResponse {
    pub fn new(group: impl Into<String>, key: impl Into<String>, deleted: bool) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
            deleted,
        }
    }
}

/// Counters of one group plus its derived hit rate.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStatsResponse {
    #[serde(flatten)]
    pub counters: CacheStats,
    /// local_hits / gets
    pub hit_rate: f64,
}

impl From<CacheStats> for GroupStatsResponse {
    fn from(counters: CacheStats) -> Self {
        Self {
            hit_rate: counters.hit_rate(),
            counters,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Address of the node that answered
    pub node: String,
    /// Per-group counters keyed by group name
    pub groups: BTreeMap<String, GroupStatsResponse>,
}

impl StatsResponse {
    pub fn new(node: impl Into<String>, groups: BTreeMap<String, CacheStats>) -> Self {
        Self {
            node: node.into(),
            groups: groups
                .into_iter()
                .map(|(name, stats)| (name, stats.into()))
                .collect(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
