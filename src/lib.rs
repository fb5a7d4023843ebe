//! Group Cache - A distributed read-through cache
//!
//! Named groups load missing keys through an application callback, keep
//! them in a byte-bounded LRU/TTL cache, and split the key space across
//! nodes with a consistent hash ring.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod tasks;

pub use api::AppState;
pub use cache::ByteView;
pub use config::Config;
pub use error::{CacheError, Result};
pub use group::{Getter, GetterFn, Group, GroupRegistry, Loaded};
pub use peers::{ClientPicker, LocalRegistry, PeerPicker, ServiceRegistry};
pub use tasks::spawn_membership_task;
