//! Serializable snapshots of a node's ring state, for debugging and tests.
use serde::Deserialize;
use serde::Serialize;

use crate::dht::RingState;
use crate::dht::SuccessorReader;
use crate::error::Error;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingInspect {
    pub name: String,
    pub id: u64,
    pub in_ring: bool,
    pub successor: String,
    #[serde(default)]
    pub predecessor: Option<String>,
    pub successors: Vec<String>,
    /// Runs of equal finger slots as `(entry, first slot, last slot)`, slots counted from 1.
    pub finger_table: Vec<(Option<String>, u64, u64)>,
    pub keys: u32,
}

impl RingInspect {
    pub async fn inspect(ring: &RingState) -> Self {
        let successors = ring
            .successors()
            .list()
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let predecessor = ring.predecessor().ok().flatten().map(|x| x.to_string());

        let finger_table = ring
            .fingers()
            .map(|ft| {
                let finger = ft.list().iter().map(|x| x.as_ref().map(|e| e.to_string()));
                compress_iter(finger)
                    .into_iter()
                    .map(|(e, start, end)| (e, start + 1, end + 1))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: ring.name().to_string(),
            id: ring.id().value(),
            in_ring: ring.is_in_ring(),
            successor: ring
                .successor()
                .map(|s| s.to_string())
                .unwrap_or_default(),
            predecessor,
            successors,
            finger_table,
            keys: ring.storage.count().await.unwrap_or_default(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::Serialize)
    }
}

/// Collapse consecutive equal items into `(item, first index, last index)`.
pub fn compress_iter<T>(iter: impl Iterator<Item = T>) -> Vec<(T, u64, u64)>
where T: PartialEq {
    let mut result: Vec<(T, u64, u64)> = vec![];
    for (i, item) in iter.enumerate() {
        let i = i as u64;
        match result.last_mut() {
            Some((last, _, end)) if *last == item => *end = i,
            _ => result.push((item, i, i)),
        }
    }
    result
}
