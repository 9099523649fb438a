//! This module defines the transport abstraction consumed by the ring engine.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// The [TransportInterface] is implemented for each way of reaching peers.
///
/// A peer is addressed by name only. Resolving a name to a location belongs to the
/// implementation, the caller never holds a handle to a remote peer.
#[async_trait]
pub trait TransportInterface {
    /// Send `data` to `target` and wait for its response.
    /// Timing out is left to the caller.
    async fn request(&self, target: &str, data: Bytes) -> Result<Bytes>;
}

/// A shared [TransportInterface].
pub type SharedTransport = Arc<dyn TransportInterface + Send + Sync>;
