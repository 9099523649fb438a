//! Chordring: a Chord ring maintenance engine.
//! --------------
//! - [Ring state](crate::dht::RingState) keeps a node's id, predecessor, successor, successor list,
//!   finger table and the key/value pairs it owns, and answers routing queries.
//! - [Stabilizer](crate::dht::Stabilizer) runs the periodic protocol that repairs pointers and
//!   fingers after joins, leaves and failures.
//! - [Node](crate::node::Node) exposes membership operations (`create`, `join`, `leave`) and
//!   key access (`get`, `put`) on top of both.
//! - [Transport](crate::transport::RingTransport) turns ring operations into requests sent over a
//!   [chordring_transport] implementation.
//!
//! # Lookup
//!
//! A lookup for an id starts locally. If the node can tell who owns the id (it lies between the
//! node and its successor, or between its predecessor and itself) the lookup ends. Otherwise the
//! node forwards to the closest finger preceding the id, and the originating node keeps asking
//! each hop until one answers with an owner.
//!
//! # Wire formats
//!
//! Key/value lists travel as `key:value;key:value;...` with keys being hashed ids in decimal.
//! Successor lists travel as `name;name;...;`.

pub mod config;
pub mod consts;
pub mod dht;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod message;
pub mod node;
pub mod storage;
pub mod transport;


pub use chordring_transport;
