//! Cache Statistics Module
//!
//! Tracks per-group counters: hits, peer traffic, loads and evictions.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Group Stats ==
/// Lock-free counters updated by a group while it serves requests.
#[derive(Debug, Default)]
pub struct GroupStats {
    gets: AtomicU64,
    local_hits: AtomicU64,
    peer_loads: AtomicU64,
    peer_errors: AtomicU64,
    loads: AtomicU64,
    load_misses: AtomicU64,
    deduped: AtomicU64,
    evictions: AtomicU64,
}

impl GroupStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `Get` call entered the group.
    pub fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_local_hit(&self) {
        self.local_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_peer_load(&self) {
        self.peer_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// A peer fetch failed and the group fell back to its loader.
    pub fn record_peer_error(&self) {
        self.peer_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load_miss(&self) {
        self.load_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller joined a request already in flight.
    pub fn record_deduped(&self) {
        self.deduped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    /// Copies the current counter values.
    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            gets: self.gets.load(Ordering::Relaxed),
            local_hits: self.local_hits.load(Ordering::Relaxed),
            peer_loads: self.peer_loads.load(Ordering::Relaxed),
            peer_errors: self.peer_errors.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_misses: self.load_misses.load(Ordering::Relaxed),
            deduped: self.deduped.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

// == Cache Stats ==
/// Point-in-time copy of a group's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// `Get` calls received
    pub gets: u64,
    /// Served from the local cache
    pub local_hits: u64,
    /// Served by the owning peer
    pub peer_loads: u64,
    /// Peer fetches that failed and fell back to the loader
    pub peer_errors: u64,
    /// Loader invocations
    pub loads: u64,
    /// Loader invocations that found nothing
    pub load_misses: u64,
    /// Callers that shared another caller's in-flight result
    pub deduped: u64,
    /// Entries evicted or expired from the local cache
    pub evictions: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns local_hits / gets, or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        if self.gets == 0 {
            0.0
        } else {
            self.local_hits as f64 / self.gets as f64
        }
    }
}
