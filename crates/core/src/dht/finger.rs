#![warn(missing_docs)]
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Endpoint;
use crate::dht::NodeId;
use crate::dht::Route;
use crate::error::Error;
use crate::error::Result;

/// Finger table of Chord DHT.
///
/// Slots run from 1 to `M`, slot 0 is never populated. When correctly maintained slot `i`
/// holds the first node at or after `id + 2^(i-1)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerTable {
    id: NodeId,
    finger: Vec<Option<Endpoint>>,
}

impl FingerTable {
    /// builder
    pub fn new(id: NodeId, bits: u8) -> Self {
        Self {
            id,
            finger: vec![None; usize::from(bits) + 1],
        }
    }

    /// Number of usable slots, that is `M`.
    pub fn len(&self) -> usize {
        self.finger.len() - 1
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.finger.iter().all(|x| x.is_none())
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<&Endpoint> {
        if index == 0 {
            return None;
        }
        self.finger.get(index).and_then(|x| x.as_ref())
    }

    /// setter
    pub fn set(&mut self, index: usize, endpoint: Endpoint) -> Result<()> {
        if index == 0 || index >= self.finger.len() {
            tracing::error!("set finger index out of range, index: {}", index);
            return Err(Error::FingerIndexOutOfRange(index));
        }
        tracing::trace!("set finger table index: {} endpoint: {}", index, endpoint);
        self.finger[index] = Some(endpoint);
        Ok(())
    }

    /// Point every slot at `endpoint`.
    pub fn fill(&mut self, endpoint: &Endpoint) {
        for slot in self.finger.iter_mut().skip(1) {
            *slot = Some(endpoint.clone());
        }
    }

    /// Remove a node from the finger table.
    ///
    /// The run of slots it occupied takes the value of the slot following the run,
    /// or becomes unset when nothing follows.
    pub fn remove(&mut self, id: NodeId) {
        let indexes: Vec<usize> = self
            .finger
            .iter()
            .enumerate()
            .filter(|(_, x)| x.as_ref().map(|e| e.id) == Some(id))
            .map(|(i, _)| i)
            .collect();

        let (Some(&first_idx), Some(&last_idx)) = (indexes.first(), indexes.last()) else {
            return;
        };
        let fix = self.finger.get(last_idx + 1).cloned().flatten();
        for idx in first_idx..=last_idx {
            if self.finger[idx].as_ref().map(|e| e.id) == Some(id) {
                self.finger[idx] = fix.clone();
            }
        }
    }

    /// Slots 1 to `M`.
    pub fn list(&self) -> &[Option<Endpoint>] {
        &self.finger[1..]
    }

    /// Scan slots `from_index` down to 1 for the closest entry preceding `target`.
    ///
    /// The first populated entry lying strictly between this node and `target` is returned as
    /// [Route::Forward]. If entries are populated but none of them precedes `target`, the
    /// lowest populated one, the nearest node known past this one, is returned as [Route::Found].
    /// Unpopulated slots are skipped.
    pub fn closest_preceding(&self, target: NodeId, from_index: usize) -> Route {
        let from = from_index.min(self.len());
        let mut nearest = None;
        for index in (1..=from).rev() {
            let Some(entry) = &self.finger[index] else {
                continue;
            };
            if entry.id.in_open(self.id, target) {
                return Route::Forward {
                    next: entry.clone(),
                    index,
                };
            }
            nearest = Some(entry);
        }
        match nearest {
            Some(entry) => Route::Found(entry.clone()),
            None => Route::NotFound,
        }
    }
}
