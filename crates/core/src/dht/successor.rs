//! Successor list for RingState
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;

use crate::dht::Endpoint;
use crate::dht::NodeId;
use crate::error::Error;
use crate::error::Result;

/// A cached chain of successors, `successor, successor.successor, ...`.
///
/// It's necessary to have multiple successors to survive the failure of the immediate one.
/// The list always holds exactly `max` entries. Slots nobody is known for point back at
/// the node itself.
#[derive(Debug, Clone)]
pub struct SuccessorList {
    /// The node owning the list
    me: Endpoint,
    /// Capacity
    max: usize,
    successors: Arc<RwLock<Vec<Endpoint>>>,
}

/// Read access to a [SuccessorList].
pub trait SuccessorReader {
    /// Entry at `index`, 0 is the immediate successor.
    fn get(&self, index: usize) -> Result<Endpoint>;
    /// Capacity of the list.
    fn len(&self) -> Result<usize>;
    /// Copy of all entries.
    fn list(&self) -> Result<Vec<Endpoint>>;
    /// Test if a node is cached.
    fn contains(&self, id: NodeId) -> Result<bool>;
}

/// Write access to a [SuccessorList].
pub trait SuccessorWriter {
    /// Point every entry at `endpoint`.
    fn reset(&self, endpoint: &Endpoint) -> Result<()>;
    /// Rebuild the list as `successor` followed by the first `max - 1` entries of `remote`,
    /// the successor list pulled from `successor`.
    fn splice(&self, successor: &Endpoint, remote: &[Endpoint]) -> Result<()>;
    /// Drop every entry for a failed node and return the new head,
    /// the node itself when nothing else is cached.
    fn evict(&self, dead: NodeId) -> Result<Endpoint>;
}

impl SuccessorList {
    /// Create a list of capacity `max` seeded with `me`.
    pub fn new(me: Endpoint, max: usize) -> Self {
        let max = max.max(1);
        Self {
            successors: Arc::new(RwLock::new(vec![me.clone(); max])),
            me,
            max,
        }
    }

    fn successors(&self) -> Result<RwLockReadGuard<Vec<Endpoint>>> {
        self.successors
            .read()
            .map_err(|_| Error::RingLock("successor list"))
    }

    fn successors_mut(&self) -> Result<RwLockWriteGuard<Vec<Endpoint>>> {
        self.successors
            .write()
            .map_err(|_| Error::RingLock("successor list"))
    }
}

impl SuccessorReader for SuccessorList {
    fn get(&self, index: usize) -> Result<Endpoint> {
        let succs = self.successors()?;
        Ok(succs.get(index).cloned().unwrap_or_else(|| self.me.clone()))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.successors()?.len())
    }

    fn list(&self) -> Result<Vec<Endpoint>> {
        Ok(self.successors()?.clone())
    }

    fn contains(&self, id: NodeId) -> Result<bool> {
        Ok(self.successors()?.iter().any(|e| e.id == id))
    }
}

impl SuccessorWriter for SuccessorList {
    fn reset(&self, endpoint: &Endpoint) -> Result<()> {
        let mut succs = self.successors_mut()?;
        *succs = vec![endpoint.clone(); self.max];
        Ok(())
    }

    fn splice(&self, successor: &Endpoint, remote: &[Endpoint]) -> Result<()> {
        let mut list = Vec::with_capacity(self.max);
        list.push(successor.clone());
        list.extend(remote.iter().take(self.max - 1).cloned());
        list.resize(self.max, self.me.clone());

        let mut succs = self.successors_mut()?;
        *succs = list;
        Ok(())
    }

    fn evict(&self, dead: NodeId) -> Result<Endpoint> {
        let mut succs = self.successors_mut()?;
        succs.retain(|e| e.id != dead);
        succs.resize(self.max, self.me.clone());
        Ok(succs[0].clone())
    }
}
