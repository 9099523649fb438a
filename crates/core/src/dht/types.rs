//! DHT types about `Endpoint`, routing results and the `Chord` traits.
#![warn(missing_docs)]
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::did::IdSpace;
use super::did::NodeId;
use crate::error::Result;

/// A named position on the ring.
///
/// Endpoints are plain values. Successor, predecessor and finger entries hold endpoints,
/// never handles to remote nodes; reaching a node always goes through the transport by `name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// Name the transport addresses the node by.
    pub name: String,
    /// Position of the node, the hash of `name`.
    pub id: NodeId,
}

impl Endpoint {
    /// Create an endpoint from its parts.
    pub fn new(name: impl Into<String>, id: NodeId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    /// Create an endpoint by hashing `name` in `space`.
    pub fn from_name(space: &IdSpace, name: impl Into<String>) -> Self {
        let name = name.into();
        let id = space.hash(&name);
        Self { name, id }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}

/// Result of a routing query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Routing terminates, the endpoint is the answer.
    Found(Endpoint),
    /// The query must be asked again on `next`, which was matched at finger `index`.
    Forward {
        /// Node closer to the target.
        next: Endpoint,
        /// Finger index `next` was found at. Index 1 is the successor.
        index: usize,
    },
    /// Nothing local can answer.
    NotFound,
}

/// Result of a liveness check run by stabilization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Liveness {
    /// The peer answered.
    Alive,
    /// The peer did not answer and the failure branch ran.
    Dead,
    /// Nothing to check, the pointer is unset or points to self.
    Skipped,
}

/// Chord is a distributed hash table (DHT) algorithm that is designed to efficiently
/// distribute data across peer-to-peer network nodes. You may want to browse its
/// [wiki](https://en.wikipedia.org/wiki/Chord_(peer-to-peer)) before you read this.
///
/// The methods of this trait only look at and mutate local state. Whenever the answer
/// lives on another node they return [Route::Forward] and let the caller drive the next
/// hop over the transport.
pub trait Chord {
    /// Answer which node owns `target` if that is known locally.
    /// Returns [Route::Found] or [Route::NotFound], never forwards.
    fn find_successor(&self, target: NodeId) -> Result<Route>;

    /// Scan the finger table from `from_index` down to 1 for the closest entry preceding `target`.
    fn closest_preceding_node(&self, target: NodeId, from_index: usize) -> Result<Route>;

    /// Local step of a lookup: [Route::Found] if the owner is known, otherwise a
    /// [Route::Forward] to a node strictly closer to `target`.
    fn next_hop(&self, target: NodeId) -> Result<Route>;

    /// Notify the ring that `candidate` believes to be our predecessor.
    /// Returns the predecessor before the update.
    fn notify(&self, candidate: Endpoint) -> Result<Option<Endpoint>>;
}

/// ChordStorage keeps the key/value pairs a node is authoritative for, that is the pairs
/// whose hashed key lies in `(predecessor, self]`.
#[async_trait]
pub trait ChordStorage: Chord {
    /// Store a pair locally.
    async fn store(&self, key: NodeId, value: String) -> Result<()>;

    /// Store many pairs locally.
    async fn store_all(&self, pairs: Vec<(NodeId, String)>) -> Result<()>;

    /// Read a pair stored locally.
    async fn fetch(&self, key: NodeId) -> Result<Option<String>>;

    /// Copy of the pairs a new predecessor `joiner` takes over,
    /// that is every pair outside `(joiner, self]`. Nothing is removed.
    async fn keys_for_predecessor(&self, joiner: NodeId) -> Result<Vec<(NodeId, String)>>;

    /// Remove the given pairs once another node holds them.
    /// A key whose value changed since is kept. Returns the number of removed pairs.
    async fn release(&self, pairs: &[(NodeId, String)]) -> Result<usize>;

    /// Remove and return the pairs whose key lies in `(from, to]`.
    async fn take_range(&self, from: NodeId, to: NodeId) -> Result<Vec<(NodeId, String)>>;

    /// Remove and return every pair.
    async fn take_all(&self) -> Result<Vec<(NodeId, String)>>;
}
