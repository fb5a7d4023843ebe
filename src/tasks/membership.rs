//! Membership Task
//!
//! Keeps a picker's ring in step with the service registry.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::peers::{ClientPicker, MembershipEvent, ServiceRegistry};

/// Spawns a task that applies membership changes to `picker`.
///
/// The watch is opened before the initial full reconciliation so no change
/// falls between the two. If the watcher lags behind the feed it
/// reconciles again instead of replaying the lost events. Events about the
/// picker's own address are ignored.
pub fn spawn_membership_task(
    picker: Arc<ClientPicker>,
    registry: Arc<dyn ServiceRegistry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let service = picker.service_name().to_string();
        let mut events = registry.watch(&service);

        reconcile(&picker, registry.as_ref(), &service).await;

        loop {
            match events.recv().await {
                Ok(MembershipEvent::Joined(addr)) => {
                    picker.join(&addr);
                }
                Ok(MembershipEvent::Left(addr)) => {
                    picker.leave(&addr);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("[{}] membership feed lagged by {} events", service, missed);
                    reconcile(&picker, registry.as_ref(), &service).await;
                }
                Err(RecvError::Closed) => {
                    info!("[{}] membership feed closed", service);
                    break;
                }
            }
        }
    })
}

async fn reconcile(picker: &ClientPicker, registry: &dyn ServiceRegistry, service: &str) {
    match registry.members(service).await {
        Ok(members) => {
            let (added, removed) = picker.reconcile(&members);
            info!(
                "[{}] reconciled membership: {} added, {} removed",
                service, added, removed
            );
        }
        Err(e) => warn!("[{}] membership reconciliation failed: {}", service, e),
    }
}
