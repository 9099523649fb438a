#![warn(missing_docs)]

//! This module defines identity on the ring.
//!
//! A ring of exponent `M` holds the ids `[0, 2^M)`. Node names and keys are placed on it
//! by hashing, see [IdSpace::hash].
//!
//! Ordering on a ring is circular: whether an id sits between two others depends on
//! walking clockwise from the first one, never on plain `<`. [NodeId::in_open] and
//! [NodeId::in_half_open] are the only comparisons routing code should use.

use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::MAX_RING_BITS;
use crate::error::Error;
use crate::error::Result;

/// A position on the ring.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Default, Serialize, Deserialize, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw value. The caller is responsible for keeping it inside its [IdSpace].
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Test if `self` lies in the open interval `(a, b)` walking clockwise from `a`.
    /// When `a == b` the interval is the whole ring except `a`.
    pub fn in_open(&self, a: NodeId, b: NodeId) -> bool {
        let (x, a, b) = (self.0, a.0, b.0);
        if a < b {
            a < x && x < b
        } else {
            x > a || x < b
        }
    }

    /// Test if `self` lies in the half open interval `(a, b]` walking clockwise from `a`.
    /// When `a == b` the interval is the whole ring.
    pub fn in_half_open(&self, a: NodeId, b: NodeId) -> bool {
        *self == b || self.in_open(a, b)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| Error::MalformedPayload(format!("invalid node id {s:?}")))
    }
}

impl From<u64> for NodeId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// The id space of a ring of exponent `bits`, owner of all modular arithmetic.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct IdSpace {
    bits: u8,
}

impl IdSpace {
    /// Create the id space `[0, 2^bits)`.
    pub fn new(bits: u8) -> Result<Self> {
        if bits == 0 || bits > MAX_RING_BITS {
            return Err(Error::InvalidRingBits(bits));
        }
        Ok(Self { bits })
    }

    /// The ring size exponent `M`.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Number of ids on the ring.
    pub fn size(&self) -> u64 {
        1u64 << self.bits
    }

    fn mask(&self) -> u64 {
        self.size() - 1
    }

    /// Test if `id` belongs to this space.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 <= self.mask()
    }

    /// Map a key or a node name onto the ring.
    ///
    /// The SHA-1 digest of `key` is read as a big-endian integer and its top `M` bits are
    /// kept, so for `M` a multiple of 8 the id is the first `M / 8` digest bytes.
    pub fn hash(&self, key: &str) -> NodeId {
        let digest = Sha1::digest(key.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        NodeId(u64::from_be_bytes(head) >> (64 - u32::from(self.bits)))
    }

    /// `id + offset` modulo the ring size.
    pub fn add(&self, id: NodeId, offset: u64) -> NodeId {
        NodeId(id.0.wrapping_add(offset) & self.mask())
    }

    /// Clockwise distance from `from` to `to`.
    pub fn distance(&self, from: NodeId, to: NodeId) -> u64 {
        to.0.wrapping_sub(from.0) & self.mask()
    }

    /// Start of finger `index` of node `id`, that is `id + 2^(index - 1)`.
    /// Finger indexes run from 1 to `M`.
    pub fn finger_start(&self, id: NodeId, index: usize) -> Result<NodeId> {
        if index == 0 || index > usize::from(self.bits) {
            return Err(Error::FingerIndexOutOfRange(index));
        }
        Ok(self.add(id, 1u64 << (index - 1)))
    }
}
