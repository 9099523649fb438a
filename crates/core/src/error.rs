//! Error of chordring_core

use crate::dht::NodeId;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in chordring-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Ring bits must be within 1..=63, got {0}")]
    InvalidRingBits(u8),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid logging level: {0}")]
    InvalidLoggingLevel(String),

    #[error("Failed to lock {0} of ring state")]
    RingLock(&'static str),

    #[error("Finger index {0} is out of range")]
    FingerIndexOutOfRange(usize),

    #[error("Node {0} is not in ring")]
    NotInRing(String),

    #[error("Node {0} is already in ring")]
    AlreadyInRing(String),

    #[error("Node id {0} is already taken by {1}")]
    DuplicateNodeId(NodeId, String),

    #[error("Peer {0} is unreachable: {1}")]
    Unreachable(String, String),

    #[error("Request to {0} timed out")]
    RequestTimeout(String),

    #[error("Lookup of {0} did not terminate within {1} hops")]
    LookupExhausted(NodeId, usize),

    #[error("No route to {0}")]
    RouteNotFound(NodeId),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Value must be non-empty and must not contain the list separator")]
    InvalidValue,

    #[error("Unexpected response to {0}")]
    UnexpectedResponse(&'static str),

    #[error("Bincode serialization error")]
    BincodeSerialize(#[source] bincode::Error),

    #[error("Bincode deserialization error")]
    BincodeDeserialize(#[source] bincode::Error),

    #[error("JSON serialization error")]
    Serialize(#[source] serde_json::Error),

    #[error("YAML config error")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IOError")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error means the remote peer could not be reached or did not answer in time.
    /// Stabilization treats these as a negative liveness signal.
    pub fn is_peer_failure(&self) -> bool {
        matches!(
            self,
            Error::Unreachable(..) | Error::RequestTimeout(_) | Error::NotInRing(_)
        )
    }
}
