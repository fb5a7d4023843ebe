//! Guarded Cache Module
//!
//! Lazily initialised, shareable wrapper around one [`CacheStore`].

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{ByteView, CacheStore, EvictCallback};
use crate::tasks::{spawn_sweep_task, SweepHandle};

// == Guarded Cache ==
/// A group's local cache.
///
/// The underlying store is built exactly once, on the first write. Reads
/// before that report a miss without allocating anything. When a sweep
/// interval is configured and a tokio runtime is available at that moment,
/// a TTL sweep task is started alongside the store and stopped with it.
pub struct GuardedCache {
    cache_bytes: u64,
    sweep_interval: Option<Duration>,
    on_evict: Option<EvictCallback<ByteView>>,
    store: OnceLock<Arc<CacheStore<ByteView>>>,
    sweeper: OnceLock<SweepHandle>,
}

impl GuardedCache {
    pub fn new(cache_bytes: u64) -> Self {
        Self {
            cache_bytes,
            sweep_interval: None,
            on_evict: None,
            store: OnceLock::new(),
            sweeper: OnceLock::new(),
        }
    }

    /// Runs a TTL sweep every `interval` once the store exists.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Observer passed on to the store when it is built.
    pub fn with_on_evict(mut self, on_evict: EvictCallback<ByteView>) -> Self {
        self.on_evict = Some(on_evict);
        self
    }

    fn store(&self) -> &Arc<CacheStore<ByteView>> {
        self.store.get_or_init(|| {
            debug!("Initializing local cache with {} bytes", self.cache_bytes);
            let mut store = CacheStore::new(self.cache_bytes);
            if let Some(on_evict) = self.on_evict.clone() {
                store = store.with_evict_callback(on_evict);
            }
            let store = Arc::new(store);

            if let Some(interval) = self.sweep_interval {
                if tokio::runtime::Handle::try_current().is_ok() {
                    let _ = self
                        .sweeper
                        .set(spawn_sweep_task(store.clone(), interval));
                }
            }
            store
        })
    }

    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.store.get()?.get(key)
    }

    pub fn add(&self, key: &str, value: ByteView) {
        self.store().add(key, value);
    }

    pub fn add_with_expiration(&self, key: &str, value: ByteView, expires_at: Instant) {
        self.store().add_with_expiration(key, value, expires_at);
    }

    /// Deleting from a cache that was never written succeeds trivially.
    pub fn delete(&self, key: &str) -> bool {
        match self.store.get() {
            Some(store) => store.delete(key),
            None => true,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.store.get().is_some()
    }

    /// Bytes currently held, zero before initialisation.
    pub fn bytes(&self) -> u64 {
        self.store.get().map_or(0, |store| store.bytes())
    }

    pub fn len(&self) -> usize {
        self.store.get().map_or(0, |store| store.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_sweeper(&self) -> bool {
        self.sweeper.get().is_some()
    }
}

impl std::fmt::Debug for GuardedCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedCache")
            .field("cache_bytes", &self.cache_bytes)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_get_before_init_does_not_allocate() {
        let cache = GuardedCache::new(100);

        assert_eq!(cache.get("missing"), None);
        assert!(cache.delete("missing"));
        assert!(!cache.is_initialized());
        assert_eq!(cache.bytes(), 0);
    }

    #[test]
    fn test_add_initializes_once() {
        let cache = Arc::new(GuardedCache::new(1 << 20));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        cache.add(&format!("{t}-{i}"), ByteView::from("v"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // A second initialisation would have lost earlier writes
        assert_eq!(cache.len(), 800);
    }

    #[test]
    fn test_delegates_to_store() {
        let cache = GuardedCache::new(100);

        cache.add("k", ByteView::from("v"));
        assert_eq!(cache.get("k"), Some(ByteView::from("v")));

        cache.add_with_expiration("t", ByteView::from("v"), Instant::now());
        assert_eq!(cache.get("t"), None);

        assert!(cache.delete("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_on_evict_is_forwarded() {
        let evictions = Arc::new(AtomicUsize::new(0));
        let counter = evictions.clone();
        let cache = GuardedCache::new(10).with_on_evict(Arc::new(move |_: &str, _: &ByteView| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        cache.add("a", ByteView::from("123456789"));
        cache.add("b", ByteView::from("123456789"));

        assert_eq!(evictions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_sweeper_outside_runtime() {
        let cache = GuardedCache::new(100).with_sweep_interval(Duration::from_secs(1));
        cache.add("k", ByteView::from("v"));
        assert!(!cache.has_sweeper());
    }

    #[tokio::test]
    async fn test_sweeper_started_inside_runtime() {
        let cache = GuardedCache::new(100).with_sweep_interval(Duration::from_millis(50));
        assert!(!cache.has_sweeper());

        cache.add_with_expiration("k", ByteView::from("v"), Instant::now());
        assert!(cache.has_sweeper());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(cache.bytes(), 0);
    }
}
