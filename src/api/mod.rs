//! API Module
//!
//! HTTP handlers and routing for a cache node.
//!
//! # Endpoints
//! - `GET /_groupcache/:group/:key` - Serve a value as its owner (raw bytes)
//! - `DELETE /_groupcache/:group/:key` - Delete a key on this node
//! - `GET /stats` - Per-group statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;

/// Path prefix of the peer RPC endpoints.
pub const BASE_PATH: &str = "/_groupcache";
