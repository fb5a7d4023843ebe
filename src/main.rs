//! Group Cache node
//!
//! Serves a demo `scores` group and joins the peers listed in `PEERS`.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groupcache::api::{create_router, AppState};
use groupcache::peers::RingConfig;
use groupcache::{
    spawn_membership_task, ClientPicker, Config, GetterFn, GroupRegistry, LocalRegistry, Loaded,
    ServiceRegistry,
};

/// Backing table of the demo group.
const SCORES: [(&str, &str); 3] = [("Tom", "630"), ("Jack", "589"), ("Sam", "567")];

fn load_score(key: &str) -> Option<Loaded> {
    info!("[SlowDB] search key {}", key);
    SCORES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, score)| Loaded::new(*score))
}

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the group registry and the demo group
/// 4. Build the peer picker and start membership tracking
/// 5. Serve the HTTP API until SIGINT/SIGTERM
/// 6. Leave the cluster
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Group Cache node");

    let config = Config::from_env();
    info!(
        "Configuration loaded: node={}, service={}, cache_bytes={}, replicas={}, sweep_interval={}s, peers={:?}",
        config.node_addr,
        config.service_name,
        config.cache_bytes,
        config.ring_replicas,
        config.sweep_interval,
        config.peers
    );

    let groups = Arc::new(GroupRegistry::new().with_sweep_interval(config.sweep_interval()));
    let scores = groups.create_or_get("scores", config.cache_bytes, Arc::new(GetterFn(load_score)));

    let picker = Arc::new(
        ClientPicker::with_ring_config(
            config.node_addr.clone(),
            RingConfig::default().with_replicas(config.ring_replicas),
        )
        .with_service_name(config.service_name.clone())
        .with_timeout(config.peer_timeout()),
    );
    scores.register_peers(picker.clone());

    let registry: Arc<dyn ServiceRegistry> = Arc::new(LocalRegistry::new());
    for peer in &config.peers {
        registry.register(&config.service_name, peer).await?;
    }
    registry
        .register(&config.service_name, &config.node_addr)
        .await?;
    let membership = spawn_membership_task(picker, registry.clone());
    info!("Membership task started");

    let app = create_router(AppState::new(groups, config.node_addr.clone()));

    let addr = config
        .listen_addr()
        .with_context(|| format!("NODE_ADDR {} has no valid port", config.node_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(membership))
        .await
        .context("server error")?;

    registry
        .deregister(&config.service_name, &config.node_addr)
        .await?;
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops membership tracking.
async fn shutdown_signal(membership: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    membership.abort();
    warn!("Membership task aborted");
}
