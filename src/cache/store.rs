//! Cache Store Module
//!
//! Byte-bounded LRU store with optional per-key expiry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::cache::entry::{entry_size, is_expired_at};
use crate::cache::{CacheEntry, CacheValue, LruTracker};

/// Observer invoked with every evicted or expired key/value pair.
pub type EvictCallback<V> = Arc<dyn Fn(&str, &V) + Send + Sync>;

// == Store State ==
struct StoreState<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Expiry instants, only for keys added with a TTL
    expires: HashMap<String, Instant>,
    /// Sum of `entry_size` over all entries
    nbytes: u64,
    /// Byte budget
    max_bytes: u64,
}

impl<V: CacheValue> StoreState<V> {
    fn insert(&mut self, key: String, value: V) {
        let added = entry_size(&key, &value);
        match self.entries.get_mut(&key) {
            Some(entry) => {
                let old = entry_size(&key, &entry.value);
                self.nbytes = self.nbytes - old + added;
                entry.value = value;
                if let Some(stamp) = self.lru.touch(entry.stamp) {
                    entry.stamp = stamp;
                }
            }
            None => {
                let stamp = self.lru.push(&key);
                self.nbytes += added;
                self.entries.insert(key, CacheEntry::new(value, stamp));
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<V> {
        self.expires.remove(key);
        let entry = self.entries.remove(key)?;
        self.lru.remove(entry.stamp);
        self.nbytes -= entry.size(key);
        Some(entry.value)
    }

    /// Evicts least recently used entries until the byte total fits the budget.
    fn free_memory_if_needed(&mut self, evicted: &mut Vec<(String, V)>) {
        while self.nbytes > self.max_bytes {
            let Some(key) = self.lru.evict_oldest() else {
                break;
            };
            self.expires.remove(&key);
            if let Some(entry) = self.entries.remove(&key) {
                self.nbytes -= entry.size(&key);
                evicted.push((key, entry.value));
            }
        }
    }
}

// == Cache Store ==
/// Bounded key/value store with byte-budget LRU eviction and optional TTL.
///
/// Every operation runs under a single mutex. The eviction observer is
/// called after that mutex is released but before the operation returns,
/// so it may safely call back into the store.
pub struct CacheStore<V> {
    state: Mutex<StoreState<V>>,
    on_evict: Option<EvictCallback<V>>,
}

impl<V: CacheValue + Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store that holds at most `max_bytes` of keys and values.
    pub fn new(max_bytes: u64) -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: HashMap::new(),
                lru: LruTracker::new(),
                expires: HashMap::new(),
                nbytes: 0,
                max_bytes,
            }),
            on_evict: None,
        }
    }

    /// Installs an eviction observer.
    pub fn with_on_evict<F>(self, f: F) -> Self
    where
        F: Fn(&str, &V) + Send + Sync + 'static,
    {
        self.with_evict_callback(Arc::new(f))
    }

    /// Installs an already shared eviction observer.
    pub fn with_evict_callback(mut self, on_evict: EvictCallback<V>) -> Self {
        self.on_evict = Some(on_evict);
        self
    }

    // == Add ==
    /// Stores `value` under `key` as the most recently used entry.
    ///
    /// Clears any expiry previously set for the key, then evicts until the
    /// store fits its budget.
    pub fn add(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let evicted = {
            let mut state = self.state.lock();
            state.expires.remove(&key);
            state.insert(key, value);
            let mut evicted = Vec::new();
            state.free_memory_if_needed(&mut evicted);
            evicted
        };
        self.notify(evicted);
    }

    // == Add With Expiration ==
    /// Same as [`add`](Self::add), additionally recording an absolute expiry.
    pub fn add_with_expiration(&self, key: impl Into<String>, value: V, expires_at: Instant) {
        let key = key.into();
        let evicted = {
            let mut state = self.state.lock();
            state.insert(key.clone(), value);
            state.expires.insert(key, expires_at);
            let mut evicted = Vec::new();
            state.free_memory_if_needed(&mut evicted);
            evicted
        };
        self.notify(evicted);
    }

    // == Get ==
    /// Retrieves a value and marks it most recently used.
    ///
    /// An entry whose expiry has passed is evicted and reported as missing.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// [`get`](Self::get) evaluated against an explicit clock reading.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut expired = Vec::new();
        let found = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            let is_expired = state
                .expires
                .get(key)
                .is_some_and(|at| is_expired_at(*at, now));
            if is_expired {
                if let Some(value) = state.remove(key) {
                    expired.push((key.to_string(), value));
                }
                None
            } else if let Some(entry) = state.entries.get_mut(key) {
                if let Some(stamp) = state.lru.touch(entry.stamp) {
                    entry.stamp = stamp;
                }
                Some(entry.value.clone())
            } else {
                None
            }
        };
        self.notify(expired);
        found
    }

    // == Delete ==
    /// Removes a key. Deleting a missing key is not an error; always returns true.
    pub fn delete(&self, key: &str) -> bool {
        self.state.lock().remove(key);
        true
    }

    // == Sweep Expired ==
    /// Drops expired entries among a bounded sample of TTL-tracked keys.
    ///
    /// At most a tenth of the tracked keys (and at least one) are inspected,
    /// in no particular order. Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    /// [`sweep_expired`](Self::sweep_expired) against an explicit clock reading.
    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        let expired = {
            let mut state = self.state.lock();
            let budget = (state.expires.len() / 10).max(1);
            let due: Vec<String> = state
                .expires
                .iter()
                .take(budget)
                .filter(|(_, at)| is_expired_at(**at, now))
                .map(|(key, _)| key.clone())
                .collect();

            due.into_iter()
                .filter_map(|key| state.remove(&key).map(|value| (key, value)))
                .collect::<Vec<_>>()
        };
        let count = expired.len();
        self.notify(expired);
        count
    }

    // == Accounting ==
    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Bytes currently charged against the budget.
    pub fn bytes(&self) -> u64 {
        self.state.lock().nbytes
    }

    pub fn max_bytes(&self) -> u64 {
        self.state.lock().max_bytes
    }

    /// Number of keys carrying an expiry.
    pub fn expiring_len(&self) -> usize {
        self.state.lock().expires.len()
    }

    fn notify(&self, evicted: Vec<(String, V)>) {
        if let Some(on_evict) = &self.on_evict {
            for (key, value) in &evicted {
                on_evict(key, value);
            }
        }
    }
}

impl<V> fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("CacheStore")
            .field("entries", &state.entries.len())
            .field("nbytes", &state.nbytes)
            .field("max_bytes", &state.max_bytes)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ByteView;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;
    use std::thread;
    use std::time::Duration;

    fn value(s: &str) -> ByteView {
        ByteView::from(s)
    }

    #[test]
    fn test_store_new() {
        let store: CacheStore<ByteView> = CacheStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.bytes(), 0);
        assert_eq!(store.max_bytes(), 100);
    }

    #[test]
    fn test_store_add_and_get() {
        let store = CacheStore::new(100);

        store.add("key1", value("value1"));

        assert_eq!(store.get("key1"), Some(value("value1")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes(), 10);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store: CacheStore<ByteView> = CacheStore::new(100);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_overwrite_adjusts_bytes() {
        let store = CacheStore::new(100);

        store.add("key1", value("v"));
        assert_eq!(store.bytes(), 5);
        store.add("key1", value("value2"));

        assert_eq!(store.get("key1"), Some(value("value2")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes(), 10);
    }

    #[test]
    fn test_store_delete_is_idempotent() {
        let store = CacheStore::new(100);

        store.add("key1", value("value1"));
        assert!(store.delete("key1"));
        assert!(store.delete("key1"));
        assert!(store.delete("never"));

        assert!(store.is_empty());
        assert_eq!(store.bytes(), 0);
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_lru_eviction_by_bytes() {
        let store = CacheStore::new(90);
        for i in 0..10 {
            store.add(i.to_string(), value("123456789"));
        }

        // "0" evicted when the total hit 100
        assert_eq!(store.get("0"), None);
        // "1" survives
        assert_eq!(store.get("1"), Some(value("123456789")));

        // Adding "a" evicts "2", the least recently used now
        store.add("a", value("123456789"));
        assert_eq!(store.get("2"), None);
        assert_eq!(store.get("3"), Some(value("123456789")));
        assert!(store.bytes() <= 90);
    }

    #[test]
    fn test_store_lru_eviction_with_expiration() {
        let store = CacheStore::new(90);
        let timeout = Instant::now() + Duration::from_secs(3);
        for i in 0..10 {
            store.add_with_expiration(i.to_string(), value("123456789"), timeout);
        }

        assert_eq!(store.get("0"), None);
        assert_eq!(store.get("1"), Some(value("123456789")));

        store.add_with_expiration("a", value("123456789"), timeout);
        assert_eq!(store.get("2"), None);
        assert_eq!(store.get("3"), Some(value("123456789")));
        // Evicted keys drop their expiry record too
        assert_eq!(store.expiring_len(), store.len());
    }

    #[test]
    fn test_store_ttl_expiration() {
        let store = CacheStore::new(100);
        let start = Instant::now();
        store.add_with_expiration("1", value("123456789"), start + Duration::from_secs(3));

        assert_eq!(
            store.get_at("1", start + Duration::from_secs(2)),
            Some(value("123456789"))
        );
        assert_eq!(store.get_at("1", start + Duration::from_secs(4)), None);
        assert!(store.is_empty());
        assert_eq!(store.bytes(), 0);
    }

    #[test]
    fn test_store_ttl_expiration_wall_clock() {
        let store = CacheStore::new(100);
        store.add_with_expiration(
            "1",
            value("123456789"),
            Instant::now() + Duration::from_millis(300),
        );

        thread::sleep(Duration::from_millis(200));
        assert!(store.get("1").is_some());
        thread::sleep(Duration::from_millis(200));
        assert!(store.get("1").is_none());
    }

    #[test]
    fn test_store_add_clears_expiration() {
        let store = CacheStore::new(100);
        let start = Instant::now();
        store.add_with_expiration("k", value("v1"), start + Duration::from_secs(1));
        store.add("k", value("v2"));

        assert_eq!(store.expiring_len(), 0);
        assert_eq!(
            store.get_at("k", start + Duration::from_secs(10)),
            Some(value("v2"))
        );
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let store = CacheStore::new(30);

        store.add("k1", value("12345678"));
        store.add("k2", value("12345678"));
        store.add("k3", value("12345678"));

        // Access k1 to make it most recently used
        store.get("k1");

        // Adding k4 should evict k2 (now oldest)
        store.add("k4", value("12345678"));

        assert!(store.get("k1").is_some());
        assert!(store.get("k2").is_none());
    }

    #[test]
    fn test_store_on_evict_observer() {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let store = CacheStore::new(20).with_on_evict(move |key: &str, _: &ByteView| {
            sink.lock().push(key.to_string());
        });

        store.add("a", value("123456789"));
        store.add("b", value("123456789"));
        store.add("c", value("123456789"));

        // "d" pushes "b" out, then expires itself on read
        let start = Instant::now();
        store.add_with_expiration("d", value("1"), start);
        store.get_at("d", start);

        assert_eq!(
            *evicted.lock(),
            vec!["a".to_string(), "b".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn test_store_on_evict_may_reenter() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let store = Arc::new_cyclic(|weak: &Weak<CacheStore<ByteView>>| {
            let weak = weak.clone();
            CacheStore::new(10).with_on_evict(move |_: &str, _: &ByteView| {
                // Would deadlock if the observer ran under the store lock
                if let Some(store) = weak.upgrade() {
                    assert_eq!(store.len(), 1);
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            })
        });

        store.add("a", value("123456789"));
        store.add("b", value("123456789"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_store_sweep_expired() {
        let store = CacheStore::new(1000);
        let start = Instant::now();

        store.add_with_expiration("gone", value("v"), start + Duration::from_secs(1));
        store.add("plain", value("v"));

        assert_eq!(store.sweep_expired_at(start), 0);
        assert_eq!(store.sweep_expired_at(start + Duration::from_secs(2)), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.bytes(), 6);
        assert_eq!(store.expiring_len(), 0);
    }

    #[test]
    fn test_store_sweep_is_bounded() {
        let store = CacheStore::new(100_000);
        let start = Instant::now();
        for i in 0..100 {
            store.add_with_expiration(format!("k{i}"), value("v"), start);
        }

        let later = start + Duration::from_secs(1);
        assert_eq!(store.sweep_expired_at(later), 10);
        assert_eq!(store.len(), 90);

        // Repeated sweeps keep making progress
        let mut total = 10;
        while store.expiring_len() > 0 {
            total += store.sweep_expired_at(later);
        }
        assert_eq!(total, 100);
        assert_eq!(store.bytes(), 0);
    }

    #[test]
    fn test_store_concurrent_adds() {
        let store = Arc::new(CacheStore::new(100_000_000));

        let handles: Vec<_> = [("first", 0), ("second", 100_000)]
            .into_iter()
            .map(|(tag, offset)| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..10_000 {
                        store.add((i + offset).to_string(), value(tag));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for i in 100_000..110_000 {
            assert_eq!(store.get(&i.to_string()), Some(value("second")));
        }
        assert_eq!(store.len(), 20_000);
    }

    #[test]
    fn test_store_zero_budget_keeps_nothing() {
        let store = CacheStore::new(0);
        store.add("k", value("v"));
        assert!(store.is_empty());
        assert_eq!(store.bytes(), 0);
    }
}
