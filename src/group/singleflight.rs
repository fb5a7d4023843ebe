//! Single Flight
//!
//! Collapses concurrent calls for the same key into one execution.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use tokio::sync::watch;

// == Single Flight ==
/// Duplicate call suppression keyed by string.
///
/// The first caller for a key runs the operation; callers arriving while it
/// is in flight wait and receive a clone of its result. The record is
/// dropped as soon as the operation finishes, so a later call runs afresh.
pub struct SingleFlight<T> {
    calls: Mutex<HashMap<String, watch::Receiver<Option<T>>>>,
}

/// Removes the in-flight record even if the leading caller is cancelled.
struct CallGuard<'a, T> {
    calls: &'a Mutex<HashMap<String, watch::Receiver<Option<T>>>>,
    key: &'a str,
}

impl<T> Drop for CallGuard<'_, T> {
    fn drop(&mut self) {
        self.calls.lock().remove(self.key);
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `op` unless a call for `key` is already in flight, in which case
    /// its result is awaited instead.
    ///
    /// Returns the result and whether it was shared from another caller.
    /// The map lock is never held while `op` runs. If the leading caller is
    /// dropped before finishing, one of its waiters takes over.
    pub async fn run<F, Fut>(&self, key: &str, op: F) -> (T, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let tx = loop {
            let mut rx = {
                let mut calls = self.calls.lock();
                match calls.get(key) {
                    Some(rx) => rx.clone(),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        calls.insert(key.to_string(), rx);
                        break tx;
                    }
                }
            };

            if let Ok(done) = rx.wait_for(Option::is_some).await {
                if let Some(value) = done.as_ref() {
                    return (value.clone(), true);
                }
            };
        };

        let guard = CallGuard {
            calls: &self.calls,
            key,
        };
        let value = op().await;
        drop(guard);

        tx.send_replace(Some(value.clone()));
        (value, false)
    }

    /// Number of keys currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}
