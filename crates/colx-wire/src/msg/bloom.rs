//! Bloom filter messages (BIP 37).

use crate::encode::{read_u32, read_u8, read_var_bytes, write_var_bytes};
use crate::message::WireMessage;
use crate::msg::require_version;
use crate::{var_int_size, WireError, WireResult, BIP0037_VERSION};
use bytes::{BufMut, Bytes, BytesMut};

/// Maximum bloom filter size in bytes.
pub const MAX_FILTER_LOAD_FILTER_SIZE: usize = 36_000;

/// Maximum number of hash functions in a bloom filter.
pub const MAX_FILTER_LOAD_HASH_FUNCS: u32 = 50;

/// Maximum data element added by `filteradd`.
pub const MAX_FILTER_ADD_DATA_SIZE: usize = 520;

/// How matched outputs update a loaded filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BloomUpdateType {
    #[default]
    None,
    All,
    P2PubkeyOnly,
}

impl BloomUpdateType {
    pub fn as_u8(&self) -> u8 {
        match self {
            BloomUpdateType::None => 0,
            BloomUpdateType::All => 1,
            BloomUpdateType::P2PubkeyOnly => 2,
        }
    }
}

impl TryFrom<u8> for BloomUpdateType {
    type Error = WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BloomUpdateType::None),
            1 => Ok(BloomUpdateType::All),
            2 => Ok(BloomUpdateType::P2PubkeyOnly),
            other => Err(WireError::InvalidMessage(format!(
                "Unknown bloom update type {}",
                other
            ))),
        }
    }
}

/// Replaces the receiver's bloom filter for this connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgFilterLoad {
    pub filter: Vec<u8>,
    pub hash_funcs: u32,
    pub tweak: u32,
    pub flags: BloomUpdateType,
}

impl MsgFilterLoad {
    pub fn new(filter: Vec<u8>, hash_funcs: u32, tweak: u32, flags: BloomUpdateType) -> Self {
        Self {
            filter,
            hash_funcs,
            tweak,
            flags,
        }
    }

    fn validate(&self) -> WireResult<()> {
        if self.filter.len() > MAX_FILTER_LOAD_FILTER_SIZE {
            return Err(WireError::InvalidMessage(format!(
                "Filter size too large: {} > {}",
                self.filter.len(),
                MAX_FILTER_LOAD_FILTER_SIZE
            )));
        }
        if self.hash_funcs > MAX_FILTER_LOAD_HASH_FUNCS {
            return Err(WireError::InvalidMessage(format!(
                "Too many filter hash functions: {} > {}",
                self.hash_funcs, MAX_FILTER_LOAD_HASH_FUNCS
            )));
        }
        Ok(())
    }
}

impl WireMessage for MsgFilterLoad {
    const COMMAND: &'static str = "filterload";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        require_version(Self::COMMAND, pver, BIP0037_VERSION)?;
        self.validate()?;
        write_var_bytes(dst, &self.filter);
        dst.put_u32_le(self.hash_funcs);
        dst.put_u32_le(self.tweak);
        dst.put_u8(self.flags.as_u8());
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        require_version(Self::COMMAND, pver, BIP0037_VERSION)?;
        let filter = read_var_bytes(buf, MAX_FILTER_LOAD_FILTER_SIZE, "filterload filter")?;
        let msg = Self {
            filter: filter.to_vec(),
            hash_funcs: read_u32(buf, "filterload hash funcs")?,
            tweak: read_u32(buf, "filterload tweak")?,
            flags: BloomUpdateType::try_from(read_u8(buf, "filterload flags")?)?,
        };
        msg.validate()?;
        Ok(msg)
    }

    fn max_payload_length(_pver: u32) -> usize {
        var_int_size(MAX_FILTER_LOAD_FILTER_SIZE as u64) + MAX_FILTER_LOAD_FILTER_SIZE + 9
    }
}

/// Adds a data element to the loaded bloom filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgFilterAdd {
    pub data: Vec<u8>,
}

impl MsgFilterAdd {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl WireMessage for MsgFilterAdd {
    const COMMAND: &'static str = "filteradd";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        require_version(Self::COMMAND, pver, BIP0037_VERSION)?;
        if self.data.len() > MAX_FILTER_ADD_DATA_SIZE {
            return Err(WireError::InvalidMessage(format!(
                "Filter add data too large: {} > {}",
                self.data.len(),
                MAX_FILTER_ADD_DATA_SIZE
            )));
        }
        write_var_bytes(dst, &self.data);
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        require_version(Self::COMMAND, pver, BIP0037_VERSION)?;
        let data = read_var_bytes(buf, MAX_FILTER_ADD_DATA_SIZE, "filteradd data")?;
        Ok(Self {
            data: data.to_vec(),
        })
    }

    fn max_payload_length(_pver: u32) -> usize {
        var_int_size(MAX_FILTER_ADD_DATA_SIZE as u64) + MAX_FILTER_ADD_DATA_SIZE
    }
}
