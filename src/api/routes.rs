//! API Routes
//!
//! Configures the Axum router with all node endpoints.

use axum::{
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, empty_key_handler, get_handler, health_handler, stats_handler, AppState,
};
use super::BASE_PATH;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /_groupcache/:group/:key` - Peer value fetch
/// - `DELETE /_groupcache/:group/:key` - Peer delete
/// - `GET|DELETE /_groupcache/:group/` - Rejected with "key required"
/// - `GET /stats` - Per-group statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            &format!("{BASE_PATH}/:group/:key"),
            get(get_handler).delete(delete_handler),
        )
        .route(
            &format!("{BASE_PATH}/:group/"),
            get(empty_key_handler).delete(empty_key_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
