//! Cache Entry Module
//!
//! Defines the structure for individual cache entries and their accounting.

use std::time::Instant;

use crate::cache::CacheValue;

// == Cache Entry ==
/// A single stored value plus its position in the LRU order.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Current stamp in the LRU tracker
    pub stamp: u64,
}

impl<V: CacheValue> CacheEntry<V> {
    // == Constructor ==
    pub fn new(value: V, stamp: u64) -> Self {
        Self { value, stamp }
    }

    // == Size ==
    /// Bytes charged against the budget for this entry under `key`.
    pub fn size(&self, key: &str) -> u64 {
        entry_size(key, &self.value)
    }
}

/// Accounting size of a key/value pair: key length plus value size.
pub fn entry_size<V: CacheValue>(key: &str, value: &V) -> u64 {
    (key.len() + value.size()) as u64
}

// == Expiry ==
/// An expiry has passed once `now` reaches it.
pub fn is_expired_at(expires_at: Instant, now: Instant) -> bool {
    now >= expires_at
}
