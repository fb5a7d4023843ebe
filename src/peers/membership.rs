//! Cluster Membership
//!
//! Service registry seam plus an in-process implementation.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::Result;

/// Buffered events per service before slow watchers start lagging.
const EVENT_BUFFER: usize = 64;

// == Membership Event ==
/// A node appearing in or disappearing from a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipEvent {
    Joined(String),
    Left(String),
}

// == Service Registry ==
/// Announces nodes under a service name and reports membership changes.
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    async fn register(&self, service: &str, addr: &str) -> Result<()>;

    async fn deregister(&self, service: &str, addr: &str) -> Result<()>;

    /// Current members of `service`.
    async fn members(&self, service: &str) -> Result<Vec<String>>;

    /// Live feed of changes to `service`, starting now.
    fn watch(&self, service: &str) -> broadcast::Receiver<MembershipEvent>;
}

// == Local Registry ==
struct Service {
    members: BTreeSet<String>,
    events: broadcast::Sender<MembershipEvent>,
}

impl Service {
    fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            members: BTreeSet::new(),
            events,
        }
    }
}

/// In-process [`ServiceRegistry`] for static clusters and tests.
#[derive(Default)]
pub struct LocalRegistry {
    services: Mutex<HashMap<String, Service>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceRegistry for LocalRegistry {
    async fn register(&self, service: &str, addr: &str) -> Result<()> {
        let mut services = self.services.lock();
        let entry = services
            .entry(service.to_string())
            .or_insert_with(Service::new);
        if entry.members.insert(addr.to_string()) {
            info!("[{}] registered {}", service, addr);
            // No watchers is fine
            let _ = entry.events.send(MembershipEvent::Joined(addr.to_string()));
        }
        Ok(())
    }

    async fn deregister(&self, service: &str, addr: &str) -> Result<()> {
        let mut services = self.services.lock();
        if let Some(entry) = services.get_mut(service) {
            if entry.members.remove(addr) {
                info!("[{}] deregistered {}", service, addr);
                let _ = entry.events.send(MembershipEvent::Left(addr.to_string()));
            }
        }
        Ok(())
    }

    async fn members(&self, service: &str) -> Result<Vec<String>> {
        let services = self.services.lock();
        Ok(services
            .get(service)
            .map(|entry| entry.members.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn watch(&self, service: &str) -> broadcast::Receiver<MembershipEvent> {
        self.services
            .lock()
            .entry(service.to_string())
            .or_insert_with(Service::new)
            .events
            .subscribe()
    }
}
