//! Provide a `MemoryTransport` that delivers requests between peers living in
//! the same process. It is what tests and single-process embedders use.

#[cfg(feature = "memory")]
mod memory;

#[cfg(feature = "memory")]
pub use crate::connections::memory::MemoryNetwork;
#[cfg(feature = "memory")]
pub use crate::connections::memory::MemoryTransport;
