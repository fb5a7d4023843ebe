//! API Handlers
//!
//! HTTP request handlers for each node endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{CacheError, Result};
use crate::group::{Group, GroupRegistry};
use crate::models::{DeleteResponse, HealthResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Groups served by this node
    pub groups: Arc<GroupRegistry>,
    /// This node's address, reported by /stats
    pub node: String,
}

impl AppState {
    pub fn new(groups: Arc<GroupRegistry>, node: impl Into<String>) -> Self {
        Self {
            groups,
            node: node.into(),
        }
    }

    /// Validates the key, then resolves the group.
    fn group(&self, name: &str, key: &str) -> Result<Arc<Group>> {
        if key.is_empty() {
            return Err(CacheError::KeyRequired);
        }
        self.groups
            .get(name)
            .ok_or_else(|| CacheError::GroupNotFound(name.to_string()))
    }
}

/// Handler for GET /_groupcache/:group/:key
///
/// Answers as the key's owner: a miss goes to this node's loader, never to
/// another peer.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((group, key)): Path<(String, String)>,
) -> Result<Response> {
    let group = state.group(&group, &key)?;
    let value = group.get_as_owner(&key).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        value.bytes(),
    )
        .into_response())
}

/// Handler for DELETE /_groupcache/:group/:key
///
/// Deletes from this node only.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((group_name, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let group = state.group(&group_name, &key)?;
    let deleted = group.delete_local(&key)?;

    Ok(Json(DeleteResponse::new(group_name, key, deleted)))
}

/// Handler for GET and DELETE /_groupcache/:group/
///
/// An empty key segment never matches the keyed route; reject it explicitly.
pub async fn empty_key_handler(Path(_group): Path<String>) -> Result<Response> {
    Err(CacheError::KeyRequired)
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.node.clone(), state.groups.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
