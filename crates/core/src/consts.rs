//! Constant variables.

/// Default ring size exponent, the ring holds `2^8` ids.
pub const DEFAULT_RING_BITS: u8 = 8;
/// Ids are held in a `u64`, so the ring cannot be larger than `2^63`.
pub const MAX_RING_BITS: u8 = 63;
/// Default capacity of the successor list.
pub const DEFAULT_MAX_SUCCESSORS: usize = 3;
/// Default pause between two stabilization rounds, in ms.
pub const DEFAULT_STABILIZE_INTERVAL_MS: u64 = 300;
/// Default lifetime of an outstanding request, in ms.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 1000;
/// Default bound on the number of hops a lookup may take.
pub const DEFAULT_MAX_HOPS: usize = 64;
/// Separates pairs in a key/value list and names in a successor list.
pub const LIST_SEPARATOR: char = ';';
/// Separates a key from its value.
pub const KEY_VALUE_SEPARATOR: char = ':';
