//! Peer Picker
//!
//! Decides which node owns a key, using the hash ring plus membership updates.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tracing::{debug, info};

use crate::peers::{HashRing, HttpPeer, PeerGetter, RingConfig, DEFAULT_PEER_TIMEOUT};

/// Membership service identity used when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "group-cache";

// == Peer Pick ==
/// Outcome of routing a key.
#[derive(Clone)]
pub enum PeerPick {
    /// No node owns the key (empty ring).
    NoPeer,
    /// This node owns the key.
    Local,
    /// Another node owns the key.
    Remote(Arc<dyn PeerGetter>),
}

impl std::fmt::Debug for PeerPick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerPick::NoPeer => f.write_str("NoPeer"),
            PeerPick::Local => f.write_str("Local"),
            PeerPick::Remote(peer) => f.debug_tuple("Remote").field(&peer.addr()).finish(),
        }
    }
}

// == Peer Picker ==
/// Maps a key to the node that owns it.
pub trait PeerPicker: Send + Sync {
    fn pick_peer(&self, key: &str) -> PeerPick;
}

// == Client Picker ==
struct PickerState {
    ring: HashRing,
    clients: HashMap<String, Arc<HttpPeer>>,
}

/// Ring-backed [`PeerPicker`] holding one HTTP client per remote node.
///
/// The ring always contains this node. Membership changes take the write
/// lock; lookups share the read lock.
pub struct ClientPicker {
    self_addr: String,
    service_name: String,
    http: Client,
    timeout: Duration,
    state: RwLock<PickerState>,
}

impl ClientPicker {
    /// Creates a picker for the node reachable at `self_addr`.
    pub fn new(self_addr: impl Into<String>) -> Self {
        Self::with_ring_config(self_addr, RingConfig::default())
    }

    pub fn with_ring_config(self_addr: impl Into<String>, config: RingConfig) -> Self {
        let self_addr = self_addr.into();
        let mut ring = HashRing::new(config);
        ring.add([&self_addr]);

        Self {
            self_addr,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            http: Client::new(),
            timeout: DEFAULT_PEER_TIMEOUT,
            state: RwLock::new(PickerState {
                ring,
                clients: HashMap::new(),
            }),
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Deadline for requests to peers added after this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    // == Join ==
    /// Adds a remote node. Returns false if it was already known or is this node.
    pub fn join(&self, addr: &str) -> bool {
        if addr == self.self_addr {
            return false;
        }
        let mut state = self.state.write();
        if state.clients.contains_key(addr) {
            return false;
        }
        state.ring.add([addr]);
        state.clients.insert(
            addr.to_string(),
            Arc::new(HttpPeer::new(addr, self.http.clone(), self.timeout)),
        );
        info!("[peer {}] node joined: {}", self.self_addr, addr);
        true
    }

    // == Leave ==
    /// Removes a remote node. Returns false if it was unknown or is this node.
    pub fn leave(&self, addr: &str) -> bool {
        if addr == self.self_addr {
            return false;
        }
        let mut state = self.state.write();
        if state.clients.remove(addr).is_none() {
            return false;
        }
        state.ring.remove(addr);
        info!("[peer {}] node left: {}", self.self_addr, addr);
        true
    }

    // == Reconcile ==
    /// Makes the remote node set equal to `members` (this node always stays).
    ///
    /// Returns how many nodes were added and removed.
    pub fn reconcile<I, S>(&self, members: I) -> (usize, usize)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted: BTreeSet<String> = members
            .into_iter()
            .map(|m| m.as_ref().to_string())
            .filter(|m| *m != self.self_addr)
            .collect();
        let stale: Vec<String> = self
            .state
            .read()
            .clients
            .keys()
            .filter(|addr| !wanted.contains(*addr))
            .cloned()
            .collect();

        let added = wanted.iter().filter(|addr| self.join(addr)).count();
        let removed = stale.iter().filter(|addr| self.leave(addr)).count();
        (added, removed)
    }

    /// All nodes on the ring, this one included, sorted.
    pub fn peers(&self) -> Vec<String> {
        let state = self.state.read();
        let mut peers: Vec<String> = state.clients.keys().cloned().collect();
        peers.push(self.self_addr.clone());
        peers.sort();
        peers
    }
}

impl PeerPicker for ClientPicker {
    fn pick_peer(&self, key: &str) -> PeerPick {
        let state = self.state.read();
        match state.ring.get(key) {
            None => PeerPick::NoPeer,
            Some(owner) if owner == self.self_addr => PeerPick::Local,
            Some(owner) => {
                debug!("[peer {}] pick peer {} for {}", self.self_addr, owner, key);
                match state.clients.get(owner) {
                    Some(client) => PeerPick::Remote(client.clone()),
                    None => PeerPick::NoPeer,
                }
            }
        }
    }
}

impl std::fmt::Debug for ClientPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPicker")
            .field("self_addr", &self.self_addr)
            .field("service_name", &self.service_name)
            .field("peers", &self.peers())
            .finish()
    }
}
