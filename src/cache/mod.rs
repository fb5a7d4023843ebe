//! Cache Module
//!
//! In-process cache engine: the byte-view payload, the byte-bounded
//! LRU/TTL store and the lazily initialised guarded wrapper used by groups.

mod byteview;
mod entry;
mod guarded;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use byteview::{ByteView, ByteViewError};
pub use entry::CacheEntry;
pub use guarded::GuardedCache;
pub use lru::LruTracker;
pub use stats::{CacheStats, GroupStats};
pub use store::{CacheStore, EvictCallback};

// == Cache Value ==
/// Anything the store can hold: it only needs to report its size in bytes.
pub trait CacheValue {
    fn size(&self) -> usize;
}

impl CacheValue for String {
    fn size(&self) -> usize {
        self.len()
    }
}

impl CacheValue for Vec<u8> {
    fn size(&self) -> usize {
        self.len()
    }
}
