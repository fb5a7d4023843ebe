//! Peer Client
//!
//! HTTP implementation of the peer RPC surface.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response, Url};
use tracing::debug;

use crate::api::BASE_PATH;
use crate::error::{CacheError, Result};
use crate::models::{DeleteResponse, ErrorResponse};

/// Deadline applied to every peer request unless configured otherwise.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(3);

// == Peer Getter ==
/// Remote operations offered by a peer that owns part of the key space.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Network identity of the peer, for logs.
    fn addr(&self) -> &str;

    async fn get(&self, group: &str, key: &str) -> Result<Bytes>;

    async fn delete(&self, group: &str, key: &str) -> Result<bool>;
}

// == HTTP Peer ==
/// Talks to another node's `/_groupcache` endpoints.
#[derive(Debug, Clone)]
pub struct HttpPeer {
    addr: String,
    client: Client,
    timeout: Duration,
}

impl HttpPeer {
    /// `addr` is the peer's `host:port`; `client` is shared between peers.
    pub fn new(addr: impl Into<String>, client: Client, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            client,
            timeout,
        }
    }

    fn url(&self, group: &str, key: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("http://{}{}/", self.addr, BASE_PATH))
            .map_err(|e| CacheError::Internal(format!("invalid peer address {}: {e}", self.addr)))?;
        url.path_segments_mut()
            .map_err(|_| CacheError::Internal(format!("invalid peer address {}", self.addr)))?
            .pop_if_empty()
            .push(group)
            .push(key);
        Ok(url)
    }

    /// Turns a non-success response into a peer error carrying the remote message.
    async fn failure(&self, op: &str, group: &str, key: &str, resp: Response) -> CacheError {
        let status = resp.status();
        let reason = match resp.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        CacheError::Peer(format!(
            "could not {op} {group}/{key} from peer {}: {reason}",
            self.addr
        ))
    }
}

#[async_trait]
impl PeerGetter for HttpPeer {
    fn addr(&self) -> &str {
        &self.addr
    }

    async fn get(&self, group: &str, key: &str) -> Result<Bytes> {
        let url = self.url(group, key)?;
        debug!("Fetching {}/{} from peer {}", group, key, self.addr);

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                CacheError::Peer(format!("could not get {group}/{key} from peer {}: {e}", self.addr))
            })?;

        if !resp.status().is_success() {
            return Err(self.failure("get", group, key, resp).await);
        }

        resp.bytes().await.map_err(|e| {
            CacheError::Peer(format!("could not read {group}/{key} from peer {}: {e}", self.addr))
        })
    }

    async fn delete(&self, group: &str, key: &str) -> Result<bool> {
        let url = self.url(group, key)?;
        debug!("Deleting {}/{} on peer {}", group, key, self.addr);

        let resp = self
            .client
            .delete(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                CacheError::Peer(format!("could not delete {group}/{key} on peer {}: {e}", self.addr))
            })?;

        if !resp.status().is_success() {
            return Err(self.failure("delete", group, key, resp).await);
        }

        let body: DeleteResponse = resp.json().await.map_err(|e| {
            CacheError::Peer(format!("bad delete reply from peer {}: {e}", self.addr))
        })?;
        Ok(body.deleted)
    }
}
