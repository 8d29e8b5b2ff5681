//! Inventory vectors: typed hashes naming objects a peer can offer or request.

use crate::encode::{read_hash, read_u32, write_hash};
use crate::{Hash256, WireResult};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Serialized size of one inventory vector: type (4) + hash (32).
pub const INV_VECT_SIZE: usize = 36;

/// Maximum inventory vectors in one `inv`, `getdata` or `notfound` message.
pub const MAX_INV_PER_MSG: usize = 50_000;

/// Kind of object an inventory vector refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvType {
    /// Data to be ignored.
    Error,
    /// Transaction.
    Tx,
    /// Block.
    Block,
    /// Merkle block for bloom-filtered peers.
    FilteredBlock,
    /// Any other type id, carried through unchanged.
    Unknown(u32),
}

impl InvType {
    /// Wire id.
    pub fn as_u32(&self) -> u32 {
        match self {
            InvType::Error => 0,
            InvType::Tx => 1,
            InvType::Block => 2,
            InvType::FilteredBlock => 3,
            InvType::Unknown(id) => *id,
        }
    }
}

impl From<u32> for InvType {
    fn from(value: u32) -> Self {
        match value {
            0 => InvType::Error,
            1 => InvType::Tx,
            2 => InvType::Block,
            3 => InvType::FilteredBlock,
            other => InvType::Unknown(other),
        }
    }
}

impl fmt::Display for InvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvType::Error => f.write_str("ERROR"),
            InvType::Tx => f.write_str("MSG_TX"),
            InvType::Block => f.write_str("MSG_BLOCK"),
            InvType::FilteredBlock => f.write_str("MSG_FILTERED_BLOCK"),
            InvType::Unknown(id) => write!(f, "Unknown InvType ({})", id),
        }
    }
}

/// An inventory vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvVect {
    /// Object type.
    pub inv_type: InvType,
    /// Object hash.
    pub hash: Hash256,
}

impl InvVect {
    /// Create a new inventory vector.
    pub fn new(inv_type: InvType, hash: Hash256) -> Self {
        Self { inv_type, hash }
    }

    pub(crate) fn encode(&self, dst: &mut BytesMut) {
        dst.put_u32_le(self.inv_type.as_u32());
        write_hash(dst, &self.hash);
    }

    pub(crate) fn decode(buf: &mut Bytes) -> WireResult<Self> {
        let inv_type = InvType::from(read_u32(buf, "inventory type")?);
        let hash = read_hash(buf, "inventory hash")?;
        Ok(Self { inv_type, hash })
    }
}

impl fmt::Display for InvVect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.inv_type, self.hash)
    }
}
