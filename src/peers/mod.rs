//! Peers Module
//!
//! Everything needed to route a key to the node that owns it: the
//! consistent hash ring, the picker built on it, the HTTP peer client and
//! the membership feed that keeps the ring current.

mod client;
mod membership;
mod picker;
mod ring;

pub use client::{HttpPeer, PeerGetter, DEFAULT_PEER_TIMEOUT};
pub use membership::{LocalRegistry, MembershipEvent, ServiceRegistry};
pub use picker::{ClientPicker, PeerPick, PeerPicker, DEFAULT_SERVICE_NAME};
pub use ring::{HashFn, HashRing, RingConfig, DEFAULT_REPLICAS};
