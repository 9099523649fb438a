#![warn(missing_docs)]
//! This module defines the messages exchanged by ring nodes.
//! Every message is a request answered by exactly one [Response].

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Endpoint;
use crate::dht::NodeId;
use crate::dht::Route;
use crate::error::Error;
use crate::error::Result;

/// First hop of a join: locate the successor of the node named `name`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct JoinSuccessor {
    /// Name of the joining node, the responder hashes it.
    pub name: String,
}

/// Further hops of a lookup: locate the owner of `target`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessor {
    /// Id to resolve.
    pub target: NodeId,
}

/// Ask the successor of a joining node for the keys the joiner now owns.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GetKeys {
    /// Name of the joining node.
    pub name: String,
}

/// Confirm a joining node stored the pairs answered to [GetKeys], so the successor can
/// drop them. Serialized as `key:value;key:value;...`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ReleaseKeys {
    /// Pairs as received by the joiner.
    pub payload: String,
}

/// What a liveness probe is sent for.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Step 0 of stabilization.
    CheckPredecessor,
    /// Step 1 of stabilization.
    CheckSuccessor,
    /// Step 2 of stabilization, before the predecessor probe.
    Stabilize,
    /// Step 4 of stabilization, before fixing the finger at this index.
    FixFingers(usize),
}

/// A liveness probe.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Alive {
    /// Reason of the probe, logged by the responder.
    pub probe: Probe,
}

/// Ask the successor for its predecessor and claim to be it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StabilizeP1 {
    /// Name of the probing node.
    pub name: String,
}

/// Ask a node for its predecessor without notifying it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StabilizeP2;

/// Ask the successor for its successor list.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SendSuccessorList;

/// Hand pairs over to the receiver, serialized as `key:value;key:value;...`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    /// Serialized pairs.
    pub payload: String,
}

/// Read a pair from the owner.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GetValue {
    /// Hashed key.
    pub key: NodeId,
}

/// Write a pair to the owner.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PutValue {
    /// Hashed key.
    pub key: NodeId,
    /// Value, must not contain `;`.
    pub value: String,
}

/// A collection of Messages.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// `join.successor`
    JoinSuccessor(JoinSuccessor),
    /// Lookup hop after the first one.
    FindSuccessor(FindSuccessor),
    /// `join.getKeys`
    GetKeys(GetKeys),
    /// Sent by a joined node once the pairs of `join.getKeys` are stored.
    ReleaseKeys(ReleaseKeys),
    /// `stabilize.*.alive`
    Alive(Alive),
    /// `stabilize.p1`
    StabilizeP1(StabilizeP1),
    /// `stabilize.p2`
    StabilizeP2(StabilizeP2),
    /// `stabilize.updateSuccessorList.sendSuccList`
    SendSuccessorList(SendSuccessorList),
    /// `storeKeys`
    StoreKeys(StoreKeys),
    /// `get`
    GetValue(GetValue),
    /// `put`
    PutValue(PutValue),
}

/// Answer to a [Message].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Response {
    /// Answer to a lookup hop, either the owner or the next hop.
    Route(Route),
    /// Serialized pairs, `key:value;key:value`.
    KeyValues(String),
    /// Liveness ack.
    Alive(bool),
    /// Predecessor of the responder, `None` while unset.
    Predecessor(Option<Endpoint>),
    /// Serialized successor list, `name;name;...;`.
    SuccessorList(String),
    /// Value read, empty if absent.
    Value(String),
    /// Write acknowledged.
    Ack,
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Message {
    /// Encode with bincode.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::BincodeSerialize)
    }

    /// Decode with bincode.
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(Error::BincodeDeserialize)
    }
}

impl Response {
    /// Encode with bincode.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(Error::BincodeSerialize)
    }

    /// Decode with bincode.
    pub fn decode(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(Error::BincodeDeserialize)
    }
}
