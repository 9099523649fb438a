#![warn(missing_docs)]
//! Implementation of the ring's DHT
//! which is based on CHORD, ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to find a successor in an N-node network is O(log N).

mod chord;
pub mod did;
/// Finger table of a ring node
pub mod finger;
mod stabilization;
pub mod successor;
pub mod types;

pub use chord::KeyStore;
pub use chord::RingState;
pub use did::IdSpace;
pub use did::NodeId;
pub use finger::FingerTable;
pub use stabilization::StabilizeStep;
pub use stabilization::Stabilizer;
pub use successor::SuccessorList;
pub use successor::SuccessorReader;
pub use successor::SuccessorWriter;
pub use types::Chord;
pub use types::ChordStorage;
pub use types::Endpoint;
pub use types::Liveness;
pub use types::Route;
