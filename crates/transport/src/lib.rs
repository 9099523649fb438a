#![warn(missing_docs)]
//! Request/response transport used by chordring nodes.
//!
//! The ring engine only needs to send a request to a named peer and await its
//! reply. [core::transport::TransportInterface] captures that capability and
//! [core::callback::TransportCallback] is what a node registers to serve
//! incoming requests. An in-memory implementation lives in [connections].
pub mod connections;
pub mod core;
pub mod error;
