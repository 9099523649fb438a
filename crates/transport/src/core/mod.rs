//! The main concepts of this mod are:
//!
//! The [TransportInterface](transport::TransportInterface) trait defines how to
//! deliver a request to a named peer and wait for its response.
//! See the [transport] module.
//!
//! The [TransportCallback](callback::TransportCallback) trait is used to let user handle
//! the requests arriving at a peer. See the [callback] module.

pub mod callback;
pub mod transport;
