//! Consistent Hash Ring
//!
//! Maps keys to nodes through virtual replicas on a 32-bit hash ring.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Hash function used to place virtual nodes and keys on the ring.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Virtual nodes per real node unless configured otherwise.
pub const DEFAULT_REPLICAS: usize = 150;

// == Ring Config ==
/// Construction parameters for a [`HashRing`].
#[derive(Clone)]
pub struct RingConfig {
    pub replicas: usize,
    pub hash: HashFn,
}

impl Default for RingConfig {
    /// CRC-32C with [`DEFAULT_REPLICAS`] virtual nodes.
    fn default() -> Self {
        Self {
            replicas: DEFAULT_REPLICAS,
            hash: Arc::new(crc32c::crc32c),
        }
    }
}

impl RingConfig {
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn with_hash<F>(mut self, hash: F) -> Self
    where
        F: Fn(&[u8]) -> u32 + Send + Sync + 'static,
    {
        self.hash = Arc::new(hash);
        self
    }
}

impl fmt::Debug for RingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingConfig")
            .field("replicas", &self.replicas)
            .finish_non_exhaustive()
    }
}

// == Hash Ring ==
/// Consistent hash ring.
///
/// Each node owns `replicas` positions at `hash("{i}{node}")`. A key is
/// owned by the node at the first position clockwise from `hash(key)`.
/// When replicas of several nodes hash to the same position, the
/// lexicographically smallest node owns it, whatever the join order.
/// Not synchronised; owners serialise mutation against lookups.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Sorted, distinct virtual node positions
    keys: Vec<u32>,
    /// Virtual position to every node claiming it; never empty
    nodes: HashMap<u32, BTreeSet<String>>,
}

impl HashRing {
    pub fn new(config: RingConfig) -> Self {
        Self {
            hash: config.hash,
            replicas: config.replicas,
            keys: Vec::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of distinct virtual positions on the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    fn virtual_hash(&self, i: usize, node: &str) -> u32 {
        (self.hash)(format!("{i}{node}").as_bytes())
    }

    // == Add ==
    /// Places every node's virtual replicas on the ring.
    pub fn add<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for node in nodes {
            let node = node.as_ref();
            for i in 0..self.replicas {
                let hash = self.virtual_hash(i, node);
                let claimants = self.nodes.entry(hash).or_default();
                if claimants.is_empty() {
                    self.keys.push(hash);
                }
                claimants.insert(node.to_string());
            }
        }
        self.keys.sort_unstable();
    }

    // == Remove ==
    /// Removes all of `node`'s virtual replicas.
    ///
    /// A position shared with another node stays on the ring, owned by
    /// the remaining claimant.
    pub fn remove(&mut self, node: &str) {
        for i in 0..self.replicas {
            let hash = self.virtual_hash(i, node);
            let Some(claimants) = self.nodes.get_mut(&hash) else {
                continue;
            };
            if !claimants.remove(node) || !claimants.is_empty() {
                continue;
            }
            self.nodes.remove(&hash);
            if let Ok(idx) = self.keys.binary_search(&hash) {
                self.keys.remove(idx);
            }
        }
    }

    // == Get ==
    /// Returns the node owning `key`, or None on an empty ring.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.is_empty() {
            return None;
        }
        let hash = (self.hash)(key.as_bytes());
        let mut idx = self.keys.partition_point(|&k| k < hash);
        if idx == self.keys.len() {
            idx = 0;
        }
        self.nodes
            .get(&self.keys[idx])
            .and_then(|claimants| claimants.first())
            .map(String::as_str)
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(RingConfig::default())
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("positions", &self.keys.len())
            .finish()
    }
}
