#![warn(missing_docs)]
//! Membership and key access of a single ring node.
//!
//! A [Node] owns the [RingState] of one member, the [RingTransport] it talks through and
//! the [MessageHandler] other members reach it by. The handler is registered with the
//! transport by the caller, see [Node::handler].

use std::sync::Arc;

use chordring_transport::core::transport::SharedTransport;

use crate::config::DhtConfig;
use crate::dht::ChordStorage;
use crate::dht::Endpoint;
use crate::dht::KeyStore;
use crate::dht::NodeId;
use crate::dht::RingState;
use crate::dht::Stabilizer;
use crate::error::Error;
use crate::error::Result;
use crate::inspect::RingInspect;
use crate::message::codec;
use crate::message::MessageHandler;
use crate::storage::MemStorage;
use crate::transport::RingTransport;

/// A ring member.
pub struct Node {
    ring: Arc<RingState>,
    transport: Arc<RingTransport>,
    config: DhtConfig,
}

impl Node {
    /// Create node `name`, not yet part of any ring, keeping its keys in memory.
    pub fn new(name: &str, config: DhtConfig, transport: SharedTransport) -> Result<Self> {
        let storage: KeyStore = Box::new(MemStorage::new());
        Self::new_with_storage(name, config, transport, storage)
    }

    /// Same as [Node::new] with a given key storage.
    pub fn new_with_storage(
        name: &str,
        config: DhtConfig,
        transport: SharedTransport,
        storage: KeyStore,
    ) -> Result<Self> {
        config.validate()?;
        let space = config.space()?;
        let ring = Arc::new(RingState::new_with_storage(
            name,
            space,
            config.max_successors,
            storage,
        ));
        tracing::debug!("created node {} in ring of 2^{}", ring.endpoint(), ring.space().bits());
        let transport = Arc::new(RingTransport::new(
            transport,
            config.request_timeout(),
            config.max_hops,
        ));
        Ok(Self {
            ring,
            transport,
            config,
        })
    }

    /// The handler serving requests addressed to this node.
    pub fn handler(&self) -> Arc<MessageHandler> {
        Arc::new(MessageHandler::new(
            self.ring.clone(),
            self.transport.clone(),
        ))
    }

    /// Name of this node.
    pub fn name(&self) -> &str {
        self.ring.name()
    }

    /// Id of this node.
    pub fn id(&self) -> NodeId {
        self.ring.id()
    }

    /// Name and id of this node.
    pub fn endpoint(&self) -> &Endpoint {
        self.ring.endpoint()
    }

    /// Ring state of this node.
    pub fn ring(&self) -> Arc<RingState> {
        self.ring.clone()
    }

    /// Configuration this node was built with.
    pub fn config(&self) -> &DhtConfig {
        &self.config
    }

    /// Whether the node is currently part of a ring.
    pub fn is_in_ring(&self) -> bool {
        self.ring.is_in_ring()
    }

    /// Start a new ring made of this node only.
    pub fn create(&self) -> Result<()> {
        if self.ring.is_in_ring() {
            return Err(Error::AlreadyInRing(self.name().to_string()));
        }
        self.ring.bootstrap()?;
        self.ring.set_in_ring(true);
        tracing::info!("{} created ring", self.endpoint());
        Ok(())
    }

    /// Join the ring `bootstrap` belongs to.
    ///
    /// The successor is resolved through `bootstrap`, then the keys this node now owns are
    /// copied from it. The successor drops them only after they are stored here, so a
    /// failed join loses nothing. The predecessor stays unset until stabilization finds it.
    pub async fn join(&self, bootstrap: &str) -> Result<()> {
        if self.ring.is_in_ring() {
            return Err(Error::AlreadyInRing(self.name().to_string()));
        }
        let successor = self
            .transport
            .join_lookup(bootstrap, self.name(), self.id())
            .await?;
        if successor.id == self.id() {
            return Err(Error::DuplicateNodeId(self.id(), successor.name));
        }
        tracing::info!(
            "{} joins through {}, successor {}",
            self.endpoint(),
            bootstrap,
            successor
        );
        self.ring.reset_to(&successor)?;
        let pairs = self.transport.get_keys(&successor.name, self.name()).await?;
        for (key, _) in pairs.iter() {
            codec::check_key(self.ring.space(), *key)?;
        }
        self.ring.store_all(pairs.clone()).await?;
        self.ring.set_in_ring(true);
        if pairs.is_empty() {
            return Ok(());
        }
        tracing::debug!("{} took {} keys from {}", self.endpoint(), pairs.len(), successor);
        // Copies left on the successor are handed back by its next notify.
        if let Err(e) = self.transport.release_keys(&successor.name, &pairs).await {
            tracing::warn!("{} failed to release keys on {}: {}", self.endpoint(), successor, e);
        }
        Ok(())
    }

    /// Leave the ring, handing every key over to the successor.
    ///
    /// If the hand-over fails the keys are put back and the node stays in ring. The last
    /// node of a ring keeps its keys and stays in ring.
    pub async fn leave(&self) -> Result<()> {
        self.ring.ensure_in_ring()?;
        let successor = self.ring.successor()?;
        if successor.id == self.id() {
            tracing::info!("{} is alone in ring, leave ignored", self.endpoint());
            return Ok(());
        }
        let pairs = self.ring.take_all().await?;
        if !pairs.is_empty() {
            if let Err(e) = self.transport.store_keys(&successor.name, &pairs).await {
                tracing::warn!("{} failed to hand keys to {}: {}", self.endpoint(), successor, e);
                self.ring.store_all(pairs).await?;
                return Err(e);
            }
        }
        self.ring.set_in_ring(false);
        tracing::info!("{} left ring, successor was {}", self.endpoint(), successor);
        Ok(())
    }

    /// Resolve the node owning `target`.
    pub async fn lookup(&self, target: NodeId) -> Result<Endpoint> {
        self.ring.ensure_in_ring()?;
        self.transport.lookup(&self.ring, target).await
    }

    /// Read the value stored under `key`, wherever it lives in the ring.
    /// An empty value reads as absent, whichever node asks.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ring.ensure_in_ring()?;
        let id = self.ring.space().hash(key);
        let owner = self.transport.lookup(&self.ring, id).await?;
        let value = if owner.id == self.id() {
            self.ring.fetch(id).await?.unwrap_or_default()
        } else {
            self.transport.get_value(&owner.name, id).await?
        };
        Ok((!value.is_empty()).then_some(value))
    }

    /// Store `value` under `key` on the node owning it.
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.ring.ensure_in_ring()?;
        codec::check_value(value)?;
        let id = self.ring.space().hash(key);
        let owner = self.transport.lookup(&self.ring, id).await?;
        tracing::debug!("put {} ({}) on {}", key, id, owner);
        if owner.id == self.id() {
            return self.ring.store(id, value.to_string()).await;
        }
        self.transport.put_value(&owner.name, id, value).await
    }

    /// Whether the successor names this node as its predecessor.
    ///
    /// The successor is read with `stabilize.p2`, so unlike a stabilization round nothing is
    /// notified.
    pub async fn successor_links_back(&self) -> Result<bool> {
        self.ring.ensure_in_ring()?;
        let successor = self.ring.successor()?;
        if successor.id == self.id() {
            return Ok(true);
        }
        let pred = self.transport.stabilize_p2(&successor.name).await?;
        Ok(pred.map(|p| p.id) == Some(self.id()))
    }

    /// A stabilization runner for this node.
    pub fn stabilizer(&self) -> Arc<Stabilizer> {
        Arc::new(Stabilizer::new(self.ring.clone(), self.transport.clone()))
    }

    /// Run stabilization rounds every `stabilize_interval_ms` until the node leaves.
    pub async fn run_stabilization(&self) {
        self.stabilizer()
            .wait(self.config.stabilize_interval())
            .await
    }

    /// Snapshot of the ring state of this node.
    pub async fn inspect(&self) -> RingInspect {
        RingInspect::inspect(&self.ring).await
    }
}
