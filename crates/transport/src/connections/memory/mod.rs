use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use rand::distributions::Distribution;

use crate::core::callback::SharedTransportCallback;
use crate::core::transport::TransportInterface;
use crate::error::Error;
use crate::error::Result;

/// A registry of in-process peers, addressed by name.
///
/// The network is injected into every [MemoryTransport] created from it, so that
/// several independent networks can live in one process.
#[derive(Default)]
pub struct MemoryNetwork {
    peers: DashMap<String, SharedTransportCallback>,
    /// Random delay range in ms applied to every request, if any.
    delay: Option<(u64, u64)>,
}

/// [MemoryTransport] sends requests to peers registered in a [MemoryNetwork].
#[derive(Clone)]
pub struct MemoryTransport {
    network: Arc<MemoryNetwork>,
}

impl MemoryNetwork {
    /// Create a network that delivers requests immediately.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a network that delays every request by a random time in `[min_ms, max_ms)`.
    pub fn with_random_delay(min_ms: u64, max_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            peers: DashMap::new(),
            delay: Some((min_ms, max_ms.max(min_ms + 1))),
        })
    }

    /// Register the callback serving requests addressed to `name`.
    pub fn register(&self, name: &str, callback: SharedTransportCallback) -> Result<()> {
        if self.peers.contains_key(name) {
            return Err(Error::PeerAlreadyExists(name.to_string()));
        }
        tracing::debug!("memory network register peer {}", name);
        self.peers.insert(name.to_string(), callback);
        Ok(())
    }

    /// Remove a peer. Further requests to it fail as if it had crashed.
    pub fn unregister(&self, name: &str) -> bool {
        tracing::debug!("memory network unregister peer {}", name);
        self.peers.remove(name).is_some()
    }

    /// Check whether `name` is reachable.
    pub fn contains(&self, name: &str) -> bool {
        self.peers.contains_key(name)
    }

    /// Names of all registered peers.
    pub fn peer_names(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.key().clone()).collect()
    }

    /// Get a transport sending into this network.
    pub fn transport(self: &Arc<Self>) -> MemoryTransport {
        MemoryTransport {
            network: self.clone(),
        }
    }

    fn callback(&self, name: &str) -> Result<SharedTransportCallback> {
        self.peers
            .get(name)
            .map(|cb| cb.value().clone())
            .ok_or_else(|| Error::PeerNotFound(name.to_string()))
    }
}

#[async_trait]
impl TransportInterface for MemoryTransport {
    async fn request(&self, target: &str, data: Bytes) -> Result<Bytes> {
        if let Some((low, high)) = self.network.delay {
            random_delay(low, high).await;
        }
        let callback = self.network.callback(target)?;
        callback
            .on_request(&data)
            .await
            .map_err(|e| Error::Remote(target.to_string(), e.to_string()))
    }
}

async fn random_delay(low: u64, high: u64) {
    tokio::time::sleep(Duration::from_millis(random(low, high))).await;
}

fn random(low: u64, high: u64) -> u64 {
    let range = rand::distributions::Uniform::new(low, high);
    let mut rng = rand::thread_rng();
    range.sample(&mut rng)
}
