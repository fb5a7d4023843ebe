//! Loader Callback
//!
//! The application-supplied source a group reads through to on a miss.

use std::time::Instant;

use async_trait::async_trait;

// == Loaded ==
/// Data returned by a [`Getter`] for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    /// Owned bytes; the group takes them over without copying
    pub value: Vec<u8>,
    /// Absolute expiry, None caches without TTL
    pub expires_at: Option<Instant>,
}

impl Loaded {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn with_expiration(mut self, expires_at: Instant) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// == Getter ==
/// Loads a key from the backing data source. `None` means the source has no data.
#[async_trait]
pub trait Getter: Send + Sync {
    async fn get(&self, key: &str) -> Option<Loaded>;
}

/// Adapts a plain function or closure into a [`Getter`].
pub struct GetterFn<F>(pub F);

#[async_trait]
impl<F> Getter for GetterFn<F>
where
    F: Fn(&str) -> Option<Loaded> + Send + Sync,
{
    async fn get(&self, key: &str) -> Option<Loaded> {
        (self.0)(key)
    }
}
