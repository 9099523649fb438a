#![warn(missing_docs)]
//! This module implemented message handler of a ring node.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chordring_transport::core::callback::CallbackError;
use chordring_transport::core::callback::TransportCallback;

use crate::dht::RingState;
use crate::error::Result;
use crate::message::types::Message;
use crate::message::types::Response;
use crate::transport::RingTransport;

/// Operator and Handler for DHT lookups and joins
pub mod dht;
/// Operator and handler for DHT stabilization
pub mod stabilization;
/// Operator and Handler for Storage
pub mod storage;

/// MessageHandler serves the requests addressed to one node.
#[derive(Clone)]
pub struct MessageHandler {
    transport: Arc<RingTransport>,
    ring: Arc<RingState>,
}

/// Generic trait for handle message, inspired by Actor-Model.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&self, msg: &T) -> Result<Response>;
}

impl MessageHandler {
    /// Create a new MessageHandler instance.
    pub fn new(ring: Arc<RingState>, transport: Arc<RingTransport>) -> Self {
        Self { transport, ring }
    }

    /// Dispatch `msg` to its handler.
    /// A node that is not in ring refuses every request, callers see it as unreachable.
    pub async fn handle_message(&self, msg: &Message) -> Result<Response> {
        self.ring.ensure_in_ring()?;
        tracing::trace!("{} handle {}", self.ring.endpoint(), msg);
        match msg {
            Message::JoinSuccessor(msg) => self.handle(msg).await,
            Message::FindSuccessor(msg) => self.handle(msg).await,
            Message::GetKeys(msg) => self.handle(msg).await,
            Message::ReleaseKeys(msg) => self.handle(msg).await,
            Message::Alive(msg) => self.handle(msg).await,
            Message::StabilizeP1(msg) => self.handle(msg).await,
            Message::StabilizeP2(msg) => self.handle(msg).await,
            Message::SendSuccessorList(msg) => self.handle(msg).await,
            Message::StoreKeys(msg) => self.handle(msg).await,
            Message::GetValue(msg) => self.handle(msg).await,
            Message::PutValue(msg) => self.handle(msg).await,
        }
    }
}

#[async_trait]
impl TransportCallback for MessageHandler {
    async fn on_request(&self, data: &Bytes) -> std::result::Result<Bytes, CallbackError> {
        let msg = Message::decode(data)?;
        match self.handle_message(&msg).await {
            Ok(resp) => Ok(Bytes::from(resp.encode()?)),
            Err(e) => {
                tracing::warn!("{} failed to handle {}: {}", self.ring.endpoint(), msg, e);
                Err(e.into())
            }
        }
    }
}
