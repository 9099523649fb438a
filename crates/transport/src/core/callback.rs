//! This module defines the callback a peer registers to serve requests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// Any error raised by a callback, reported back to the requester as a remote failure.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// The [TransportCallback] is invoked with the raw payload of every incoming request.
/// The returned bytes are delivered to the requester as the response.
#[async_trait]
pub trait TransportCallback {
    /// This method is invoked when a request arrives.
    async fn on_request(&self, data: &Bytes) -> Result<Bytes, CallbackError>;
}

/// A shared [TransportCallback], cloned into every in-flight request.
pub type SharedTransportCallback = Arc<dyn TransportCallback + Send + Sync>;
