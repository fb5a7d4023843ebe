//! Group Registry
//!
//! Owns every named group of a node.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;

use crate::cache::CacheStats;
use crate::group::{Getter, Group};

/// Name to group map, held by the application rather than as global state.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
    sweep_interval: Option<Duration>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Groups created from now on sweep expired entries every `interval`.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    // == Create Or Get ==
    /// Returns the group called `name`, creating it if absent.
    ///
    /// An existing group is returned untouched; `cache_bytes` and `getter`
    /// only apply to a new one.
    pub fn create_or_get(
        &self,
        name: &str,
        cache_bytes: u64,
        getter: Arc<dyn Getter>,
    ) -> Arc<Group> {
        if let Some(group) = self.groups.read().get(name) {
            return group.clone();
        }

        let mut groups = self.groups.write();
        groups
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Created group {} with {} bytes", name, cache_bytes);
                Arc::new(Group::build(
                    name.to_string(),
                    cache_bytes,
                    getter,
                    self.sweep_interval,
                ))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).cloned()
    }

    /// Forgets the group. Holders of its `Arc` keep a working instance.
    pub fn destroy(&self, name: &str) -> bool {
        let removed = self.groups.write().remove(name).is_some();
        if removed {
            info!("Destroyed group {}", name);
        }
        removed
    }

    /// Registered group names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Statistics snapshot of every group.
    pub fn stats(&self) -> BTreeMap<String, CacheStats> {
        self.groups
            .read()
            .iter()
            .map(|(name, group)| (name.clone(), group.stats()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{GetterFn, Loaded};

    fn getter() -> Arc<dyn Getter> {
        Arc::new(GetterFn(|key: &str| Some(Loaded::new(key))))
    }

    #[test]
    fn test_create_or_get_returns_existing() {
        let registry = GroupRegistry::new();

        let first = registry.create_or_get("scores", 100, getter());
        let second = registry.create_or_get("scores", 999, getter());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.names(), vec!["scores"]);
    }

    #[test]
    fn test_get_and_destroy() {
        let registry = GroupRegistry::new();
        registry.create_or_get("b", 100, getter());
        registry.create_or_get("a", 100, getter());

        assert!(registry.get("a").is_some());
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["a", "b"]);

        assert!(registry.destroy("a"));
        assert!(!registry.destroy("a"));
        assert!(registry.get("a").is_none());
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_stats_per_group() {
        let registry = GroupRegistry::new().with_sweep_interval(Duration::from_secs(60));
        let group = registry.create_or_get("scores", 100, getter());

        group.get("Tom").await.unwrap();
        group.get("Tom").await.unwrap();

        let stats = registry.stats();
        assert_eq!(stats["scores"].gets, 2);
        assert_eq!(stats["scores"].loads, 1);
    }
}
