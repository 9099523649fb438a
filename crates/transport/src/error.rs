#![allow(missing_docs)]

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Peer {0} not found, it should register first")]
    PeerNotFound(String),

    #[error("Peer {0} already registered")]
    PeerAlreadyExists(String),

    #[error("Remote peer {0} failed to handle request: {1}")]
    Remote(String, String),
}
