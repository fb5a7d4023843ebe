//! Configuration Module
//!
//! Handles loading node configuration from environment variables.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::peers::{DEFAULT_REPLICAS, DEFAULT_SERVICE_NAME};

/// Node configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// This node's `host:port`, as peers reach it
    pub node_addr: String,
    /// Membership service identity
    pub service_name: String,
    /// Byte budget of the demo group
    pub cache_bytes: u64,
    /// Virtual nodes per peer on the hash ring
    pub ring_replicas: usize,
    /// TTL sweep interval in seconds
    pub sweep_interval: u64,
    /// Per-request deadline for peer calls, in milliseconds
    pub peer_timeout_ms: u64,
    /// Statically known cluster members
    pub peers: Vec<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NODE_ADDR` - This node's address (default: 127.0.0.1:8080)
    /// - `SERVICE_NAME` - Membership service name (default: group-cache)
    /// - `CACHE_BYTES` - Demo group budget in bytes (default: 1048576)
    /// - `RING_REPLICAS` - Virtual nodes per peer (default: 150)
    /// - `SWEEP_INTERVAL` - TTL sweep frequency in seconds (default: 3600)
    /// - `PEER_TIMEOUT_MS` - Peer request deadline (default: 3000)
    /// - `PEERS` - Comma-separated peer addresses (default: none)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node_addr: env::var("NODE_ADDR").unwrap_or(defaults.node_addr),
            service_name: env::var("SERVICE_NAME").unwrap_or(defaults.service_name),
            cache_bytes: parse_var("CACHE_BYTES").unwrap_or(defaults.cache_bytes),
            ring_replicas: parse_var("RING_REPLICAS").unwrap_or(defaults.ring_replicas),
            sweep_interval: parse_var("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            peer_timeout_ms: parse_var("PEER_TIMEOUT_MS").unwrap_or(defaults.peer_timeout_ms),
            peers: env::var("PEERS")
                .map(|raw| parse_peers(&raw))
                .unwrap_or(defaults.peers),
        }
    }

    /// Address to bind: every interface, on the port of `node_addr`.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        let (_, port) = self.node_addr.rsplit_once(':')?;
        let port: u16 = port.parse().ok()?;
        Some(SocketAddr::from(([0, 0, 0, 0], port)))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn peer_timeout(&self) -> Duration {
        Duration::from_millis(self.peer_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_addr: "127.0.0.1:8080".to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            cache_bytes: 1 << 20,
            ring_replicas: DEFAULT_REPLICAS,
            sweep_interval: 3600,
            peer_timeout_ms: 3000,
            peers: Vec::new(),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Splits a comma-separated address list, skipping blanks.
pub fn parse_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}
