//! TTL Sweep Task
//!
//! Background task that periodically purges a bounded share of expired entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{CacheStore, CacheValue};

// == Sweep Handle ==
/// Owns a running sweep task. The task stops on [`stop`](Self::stop) or when
/// the handle is dropped.
#[derive(Debug)]
pub struct SweepHandle {
    handle: JoinHandle<()>,
}

impl SweepHandle {
    /// Cancels the task.
    pub fn stop(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawns a task that calls [`CacheStore::sweep_expired`] every `interval`.
///
/// Each tick takes the store lock once and inspects at most a tenth of the
/// keys that carry an expiry, so a large TTL set never stalls foreground
/// operations.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::<ByteView>::new(1 << 20));
/// let sweeper = spawn_sweep_task(store.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweeper.stop();
/// ```
pub fn spawn_sweep_task<V>(store: Arc<CacheStore<V>>, interval: Duration) -> SweepHandle
where
    V: CacheValue + Clone + Send + 'static,
{
    let handle = tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.sweep_expired();
            if removed > 0 {
                info!("TTL sweep: removed {} expired entries", removed);
            } else {
                debug!("TTL sweep: no expired entries found");
            }
        }
    });

    SweepHandle { handle }
}
