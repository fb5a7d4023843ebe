//! Response models for the node's HTTP API
//!
//! This module defines the DTOs serialized by the server and parsed back by
//! peer clients.

pub mod responses;

// Re-export commonly used types
pub use responses::{
    DeleteResponse, ErrorResponse, GroupStatsResponse, HealthResponse, StatsResponse,
};
