//! Group Module
//!
//! A named read-through cache: local cache, owning peer, then the loader.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cache::{ByteView, CacheStats, GroupStats, GuardedCache};
use crate::error::{CacheError, Result};
use crate::group::{Getter, SingleFlight};
use crate::peers::{PeerGetter, PeerPick, PeerPicker};

// == Group ==
/// One named cache namespace.
///
/// `get` is deduplicated per key: concurrent requests for the same key
/// share one trip to the peer or loader. Whatever value is obtained lands
/// in the local cache.
pub struct Group {
    name: String,
    getter: Arc<dyn Getter>,
    main_cache: GuardedCache,
    peers: OnceLock<Arc<dyn PeerPicker>>,
    loader: SingleFlight<Result<ByteView>>,
    /// Separate from `loader` so owner requests never join a forwarding call
    owner_loader: SingleFlight<Result<ByteView>>,
    stats: Arc<GroupStats>,
}

impl Group {
    /// Creates a group whose local cache holds at most `cache_bytes`.
    pub fn new(name: impl Into<String>, cache_bytes: u64, getter: Arc<dyn Getter>) -> Self {
        Self::build(name.into(), cache_bytes, getter, None)
    }

    pub(crate) fn build(
        name: String,
        cache_bytes: u64,
        getter: Arc<dyn Getter>,
        sweep_interval: Option<Duration>,
    ) -> Self {
        let stats = Arc::new(GroupStats::new());
        let evictions = stats.clone();
        let mut main_cache = GuardedCache::new(cache_bytes)
            .with_on_evict(Arc::new(move |_: &str, _: &ByteView| evictions.record_eviction()));
        if let Some(interval) = sweep_interval {
            main_cache = main_cache.with_sweep_interval(interval);
        }

        Self {
            name,
            getter,
            main_cache,
            peers: OnceLock::new(),
            loader: SingleFlight::new(),
            owner_loader: SingleFlight::new(),
            stats,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // == Register Peers ==
    /// Routes future requests through `peers`.
    ///
    /// # Panics
    /// If called more than once for the same group.
    pub fn register_peers(&self, peers: Arc<dyn PeerPicker>) {
        if self.peers.set(peers).is_err() {
            panic!("register_peers called more than once for group {}", self.name);
        }
    }

    // == Get ==
    /// Returns the value for `key` from the local cache, the owning peer or
    /// the loader, in that order of preference.
    pub async fn get(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::KeyRequired);
        }
        self.stats.record_get();

        let (result, shared) = self.loader.run(key, || self.load(key)).await;
        if shared {
            self.stats.record_deduped();
        }
        result
    }

    /// Serves `key` as its owner: never forwards to another peer.
    ///
    /// Used for requests that arrive from peers, so two nodes with
    /// diverging ring views cannot bounce a key between them. Deduplicated
    /// among owner requests only; an in-flight `get` forwarding the same key
    /// is never joined.
    pub async fn get_as_owner(&self, key: &str) -> Result<ByteView> {
        if key.is_empty() {
            return Err(CacheError::KeyRequired);
        }
        self.stats.record_get();

        let (result, shared) = self
            .owner_loader
            .run(key, || self.get_locally(key))
            .await;
        if shared {
            self.stats.record_deduped();
        }
        result
    }

    async fn load(&self, key: &str) -> Result<ByteView> {
        if let Some(peers) = self.peers.get() {
            match peers.pick_peer(key) {
                PeerPick::Local => {
                    if let Some(value) = self.main_cache.get(key) {
                        debug!("[group {}] cache hit for {}", self.name, key);
                        self.stats.record_local_hit();
                        return Ok(value);
                    }
                }
                PeerPick::Remote(peer) => match self.get_from_peer(peer.as_ref(), key).await {
                    Ok(value) => {
                        self.stats.record_peer_load();
                        return Ok(value);
                    }
                    Err(e) => {
                        self.stats.record_peer_error();
                        warn!(
                            "[group {}] failed to get {} from peer {}: {}",
                            self.name,
                            key,
                            peer.addr(),
                            e
                        );
                    }
                },
                PeerPick::NoPeer => {}
            }
        }
        self.get_locally(key).await
    }

    async fn get_from_peer(&self, peer: &dyn PeerGetter, key: &str) -> Result<ByteView> {
        let bytes = peer.get(&self.name, key).await?;
        // Never keep the transport's buffer alive inside the cache
        let value = ByteView::copy_from_slice(&bytes);
        self.populate_cache(key, value.clone(), None);
        Ok(value)
    }

    async fn get_locally(&self, key: &str) -> Result<ByteView> {
        // A waiter of an earlier flight may already have filled it
        if let Some(value) = self.main_cache.get(key) {
            debug!("[group {}] cache hit for {}", self.name, key);
            self.stats.record_local_hit();
            return Ok(value);
        }

        self.stats.record_load();
        let Some(loaded) = self.getter.get(key).await else {
            debug!("[group {}] loader has no data for {}", self.name, key);
            self.stats.record_load_miss();
            return Err(CacheError::NotFound(key.to_string()));
        };

        let value = ByteView::from(loaded.value);
        self.populate_cache(key, value.clone(), loaded.expires_at);
        Ok(value)
    }

    fn populate_cache(&self, key: &str, value: ByteView, expires_at: Option<Instant>) {
        match expires_at {
            Some(at) => self.main_cache.add_with_expiration(key, value, at),
            None => self.main_cache.add(key, value),
        }
    }

    // == Delete ==
    /// Deletes `key` on the node that owns it.
    ///
    /// Returns false when no node owns the key. Remote failures are returned
    /// as is. Not deduplicated.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Err(CacheError::KeyRequired);
        }

        let Some(peers) = self.peers.get() else {
            return Ok(self.main_cache.delete(key));
        };

        match peers.pick_peer(key) {
            PeerPick::NoPeer => Ok(false),
            PeerPick::Local => Ok(self.main_cache.delete(key)),
            PeerPick::Remote(peer) => {
                // Drop any copy fetched from the owner earlier
                self.main_cache.delete(key);
                peer.delete(&self.name, key).await
            }
        }
    }

    /// Deletes `key` from this node only.
    pub fn delete_local(&self, key: &str) -> Result<bool> {
        if key.is_empty() {
            return Err(CacheError::KeyRequired);
        }
        Ok(self.main_cache.delete(key))
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Bytes held by the local cache.
    pub fn cache_bytes(&self) -> u64 {
        self.main_cache.bytes()
    }
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("name", &self.name)
            .field("main_cache", &self.main_cache)
            .field("has_peers", &self.peers.get().is_some())
            .finish()
    }
}
