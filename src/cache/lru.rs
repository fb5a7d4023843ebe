//! LRU Tracker Module
//!
//! Implements Least Recently Used ordering for cache eviction.

use std::collections::BTreeMap;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every tracked key owns a monotonically increasing stamp:
/// - Lowest stamp = Least recently used
/// - Highest stamp = Most recently used
///
/// The caller keeps each key's current stamp (the store keeps it in the
/// entry), which makes touch and remove `O(log n)`.
#[derive(Debug, Default)]
pub struct LruTracker {
    /// Keys ordered by last access stamp
    order: BTreeMap<u64, String>,
    /// Next stamp to hand out
    next: u64,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push ==
    /// Tracks `key` as the most recently used and returns its stamp.
    pub fn push(&mut self, key: &str) -> u64 {
        let stamp = self.next;
        self.next += 1;
        self.order.insert(stamp, key.to_string());
        stamp
    }

    // == Touch ==
    /// Marks the key holding `stamp` as most recently used.
    ///
    /// Returns the new stamp, or None if the stamp is not tracked.
    pub fn touch(&mut self, stamp: u64) -> Option<u64> {
        let key = self.order.remove(&stamp)?;
        let fresh = self.next;
        self.next += 1;
        self.order.insert(fresh, key);
        Some(fresh)
    }

    // == Remove ==
    /// Stops tracking the key holding `stamp`.
    pub fn remove(&mut self, stamp: u64) -> Option<String> {
        self.order.remove(&stamp)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<String> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    #[allow(dead_code)]
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.first_key_value().map(|(_, key)| key.as_str())
    }

    // == Length ==
    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
