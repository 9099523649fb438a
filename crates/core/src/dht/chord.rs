//! Chord ring state of a single node.
#![warn(missing_docs)]
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use async_trait::async_trait;

use super::did::IdSpace;
use super::did::NodeId;
use super::finger::FingerTable;
use super::successor::SuccessorList;
use super::successor::SuccessorReader;
use super::successor::SuccessorWriter;
use super::types::Chord;
use super::types::ChordStorage;
use super::types::Endpoint;
use super::types::Route;
use crate::error::Error;
use crate::error::Result;
use crate::storage::KvStorageInterface;
use crate::storage::MemStorage;

/// Storage of the pairs owned by a node.
pub type KeyStore = Box<dyn KvStorageInterface<NodeId, String> + Send + Sync>;

/// RingState is everything a node knows about the ring: its own position, its
/// neighbours, its finger table and the keys it owns.
///
/// Mutations come from two places, the stabilization driver of this node and the
/// handlers of requests sent by other nodes. Each field sits behind its own lock and no
/// lock is held across an `await`.
pub struct RingState {
    me: Endpoint,
    space: IdSpace,
    successor: Arc<Mutex<Endpoint>>,
    predecessor: Arc<Mutex<Option<Endpoint>>>,
    successors: SuccessorList,
    finger: Arc<Mutex<FingerTable>>,
    /// Pairs whose hashed key lies in `(predecessor, me]`.
    pub storage: KeyStore,
    in_ring: AtomicBool,
}

impl RingState {
    /// Create the state of node `name`, not yet in any ring, with in-memory key storage.
    pub fn new(name: &str, space: IdSpace, max_successors: usize) -> Self {
        Self::new_with_storage(name, space, max_successors, Box::new(MemStorage::new()))
    }

    /// Same as [RingState::new] with a given key storage.
    pub fn new_with_storage(
        name: &str,
        space: IdSpace,
        max_successors: usize,
        storage: KeyStore,
    ) -> Self {
        let me = Endpoint::from_name(&space, name);
        Self {
            successor: Arc::new(Mutex::new(me.clone())),
            predecessor: Arc::new(Mutex::new(None)),
            successors: SuccessorList::new(me.clone(), max_successors),
            finger: Arc::new(Mutex::new(FingerTable::new(me.id, space.bits()))),
            storage,
            in_ring: AtomicBool::new(false),
            space,
            me,
        }
    }

    /// Id of this node.
    pub fn id(&self) -> NodeId {
        self.me.id
    }

    /// Name of this node.
    pub fn name(&self) -> &str {
        &self.me.name
    }

    /// This node as an endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.me
    }

    /// The id space of the ring.
    pub fn space(&self) -> &IdSpace {
        &self.space
    }

    /// Whether the node has completed bootstrap and not left since.
    pub fn is_in_ring(&self) -> bool {
        self.in_ring.load(Ordering::SeqCst)
    }

    /// Mark the node in or out of ring.
    pub fn set_in_ring(&self, in_ring: bool) {
        self.in_ring.store(in_ring, Ordering::SeqCst)
    }

    /// Fail with [Error::NotInRing] unless the node is in ring.
    pub fn ensure_in_ring(&self) -> Result<()> {
        if self.is_in_ring() {
            Ok(())
        } else {
            Err(Error::NotInRing(self.me.name.clone()))
        }
    }

    /// Lock and return MutexGuard of the finger table.
    pub fn lock_finger(&self) -> Result<MutexGuard<FingerTable>> {
        self.finger.lock().map_err(|_| Error::RingLock("finger table"))
    }

    /// Lock and return MutexGuard of the predecessor.
    pub fn lock_predecessor(&self) -> Result<MutexGuard<Option<Endpoint>>> {
        self.predecessor
            .lock()
            .map_err(|_| Error::RingLock("predecessor"))
    }

    /// Lock and return MutexGuard of the successor.
    pub fn lock_successor(&self) -> Result<MutexGuard<Endpoint>> {
        self.successor.lock().map_err(|_| Error::RingLock("successor"))
    }

    /// Current successor.
    pub fn successor(&self) -> Result<Endpoint> {
        Ok(self.lock_successor()?.clone())
    }

    /// Current predecessor, `None` until known.
    pub fn predecessor(&self) -> Result<Option<Endpoint>> {
        Ok(self.lock_predecessor()?.clone())
    }

    /// The cached successor list.
    pub fn successors(&self) -> &SuccessorList {
        &self.successors
    }

    /// Copy of the finger table.
    pub fn fingers(&self) -> Result<FingerTable> {
        Ok(self.lock_finger()?.clone())
    }

    /// Turn this node into a single node ring: successor, predecessor, successor list and
    /// fingers all point at self.
    pub fn bootstrap(&self) -> Result<()> {
        self.reset_to(&self.me)?;
        *self.lock_predecessor()? = Some(self.me.clone());
        Ok(())
    }

    /// Seed successor, successor list and fingers with `successor` and clear the predecessor.
    /// This is what a joining node does once its successor is resolved.
    pub fn reset_to(&self, successor: &Endpoint) -> Result<()> {
        *self.lock_successor()? = successor.clone();
        self.successors.reset(successor)?;
        self.lock_finger()?.fill(successor);
        *self.lock_predecessor()? = None;
        Ok(())
    }

    /// Adopt `successor` found by the predecessor probe.
    pub fn adopt_successor(&self, successor: Endpoint) -> Result<()> {
        tracing::info!("{} adopts successor {}", self.me, successor);
        *self.lock_successor()? = successor;
        Ok(())
    }

    /// Rebuild the successor list from the list pulled from `successor`.
    /// Nothing changes if the successor moved since the list was requested.
    pub fn update_successor_list(&self, successor: &Endpoint, remote: &[Endpoint]) -> Result<()> {
        if self.successor()?.id != successor.id {
            tracing::debug!(
                "{} drops successor list of {}, successor changed",
                self.me,
                successor
            );
            return Ok(());
        }
        self.successors.splice(successor, remote)
    }

    /// Set finger `index`.
    pub fn set_finger(&self, index: usize, endpoint: Endpoint) -> Result<()> {
        self.lock_finger()?.set(index, endpoint)
    }

    /// The predecessor did not answer.
    ///
    /// If it was also the successor the ring is down to this node, so the successor and
    /// the successor list collapse to self. The predecessor becomes unset either way.
    pub fn set_dead_predecessor(&self) -> Result<()> {
        let Some(dead) = self.lock_predecessor()?.take() else {
            return Ok(());
        };
        tracing::warn!("{} lost predecessor {}", self.me, dead);
        let mut successor = self.lock_successor()?;
        if successor.id == dead.id {
            *successor = self.me.clone();
            self.successors.reset(&self.me)?;
        }
        drop(successor);
        self.lock_finger()?.remove(dead.id);
        Ok(())
    }

    /// The successor did not answer: replace it with the next entry of the successor list
    /// and forget it everywhere else. Returns the new successor.
    pub fn replace_dead_successor(&self) -> Result<Endpoint> {
        let dead = self.successor()?;
        let next = self.successors.evict(dead.id)?;
        tracing::warn!(
            "{} lost successor {}, replaced with {}",
            self.me,
            dead,
            next
        );
        *self.lock_successor()? = next.clone();
        self.lock_finger()?.remove(dead.id);
        let mut predecessor = self.lock_predecessor()?;
        if predecessor.as_ref().map(|p| p.id) == Some(dead.id) {
            *predecessor = None;
        }
        Ok(next)
    }

    /// Whether `key` falls in the interval this node is authoritative for.
    /// Without a known predecessor the node claims every key.
    pub fn owns(&self, key: NodeId) -> Result<bool> {
        Ok(match self.predecessor()? {
            Some(pred) => key.in_half_open(pred.id, self.me.id),
            None => true,
        })
    }
}

impl Chord for RingState {
    /// The successor owns `(self, successor]`. A singleton ring owns everything. With a
    /// known predecessor this node owns `(predecessor, self]`, which in a two node ring,
    /// where predecessor and successor coincide, is the whole other half.
    fn find_successor(&self, target: NodeId) -> Result<Route> {
        let successor = self.successor()?;
        if successor.id == self.me.id || target == self.me.id {
            return Ok(Route::Found(self.me.clone()));
        }
        if target.in_half_open(self.me.id, successor.id) {
            return Ok(Route::Found(successor));
        }
        if let Some(pred) = self.predecessor()? {
            if pred.id == successor.id || target.in_half_open(pred.id, self.me.id) {
                return Ok(Route::Found(self.me.clone()));
            }
        }
        Ok(Route::NotFound)
    }

    fn closest_preceding_node(&self, target: NodeId, from_index: usize) -> Result<Route> {
        Ok(self.lock_finger()?.closest_preceding(target, from_index))
    }

    /// When no finger precedes `target` the successor does, since `target` is not in
    /// `(self, successor]` once [Chord::find_successor] failed.
    fn next_hop(&self, target: NodeId) -> Result<Route> {
        if let found @ Route::Found(_) = self.find_successor(target)? {
            return Ok(found);
        }
        match self.closest_preceding_node(target, usize::from(self.space.bits()))? {
            forward @ Route::Forward { .. } => Ok(forward),
            _ => Ok(Route::Forward {
                next: self.successor()?,
                index: 1,
            }),
        }
    }

    fn notify(&self, candidate: Endpoint) -> Result<Option<Endpoint>> {
        if candidate.id == self.me.id {
            return self.predecessor();
        }
        let previous = self.lock_predecessor()?.replace(candidate.clone());
        if previous.as_ref() != Some(&candidate) {
            tracing::info!("{} set predecessor {}", self.me, candidate);
        }
        let mut successor = self.lock_successor()?;
        if successor.id == self.me.id {
            tracing::info!("{} leaves singleton ring with {}", self.me, candidate);
            *successor = candidate.clone();
            drop(successor);
            self.successors.splice(&candidate, &[])?;
        }
        Ok(previous)
    }
}

#[async_trait]
impl ChordStorage for RingState {
    async fn store(&self, key: NodeId, value: String) -> Result<()> {
        self.storage.put(&key, &value).await
    }

    async fn store_all(&self, pairs: Vec<(NodeId, String)>) -> Result<()> {
        for (key, value) in pairs {
            self.storage.put(&key, &value).await?;
        }
        Ok(())
    }

    async fn fetch(&self, key: NodeId) -> Result<Option<String>> {
        self.storage.get(&key).await
    }

    async fn keys_for_predecessor(&self, joiner: NodeId) -> Result<Vec<(NodeId, String)>> {
        let me = self.me.id;
        let mut pairs = self.storage.get_all().await?;
        pairs.retain(|(k, _)| !k.in_half_open(joiner, me));
        Ok(pairs)
    }

    async fn release(&self, pairs: &[(NodeId, String)]) -> Result<usize> {
        let mut removed = 0;
        for (key, value) in pairs {
            if self.storage.get(key).await?.as_ref() == Some(value) {
                self.storage.remove(key).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn take_range(&self, from: NodeId, to: NodeId) -> Result<Vec<(NodeId, String)>> {
        self.storage
            .take_where(&move |k: &NodeId| k.in_half_open(from, to))
            .await
    }

    async fn take_all(&self) -> Result<Vec<(NodeId, String)>> {
        self.storage.take_where(&|_: &NodeId| true).await
    }
}
