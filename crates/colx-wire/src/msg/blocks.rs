//! Block headers, blocks and the block/header request messages.

use crate::encode::{
    read_count, read_hash, read_i32, read_u32, read_var_bytes, read_var_int, write_hash,
    write_var_bytes, write_var_int,
};
use crate::message::WireMessage;
use crate::msg::require_version;
use crate::msg::tx::MIN_TX_PAYLOAD;
use crate::{
    Hash256, MsgTx, WireError, WireResult, BIP0037_VERSION, MAX_BLOCK_PAYLOAD, MAX_VAR_INT_PAYLOAD,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::{SystemTime, UNIX_EPOCH};

/// Serialized size of a block header.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Maximum headers in a single `headers` message.
pub const MAX_BLOCK_HEADERS_PER_MSG: usize = 2000;

/// Maximum locator hashes in `getblocks` / `getheaders`.
pub const MAX_BLOCK_LOCATORS_PER_MSG: usize = 500;

const MAX_TX_PER_BLOCK: usize = MAX_BLOCK_PAYLOAD / MIN_TX_PAYLOAD + 1;
const MAX_FLAGS_PER_MERKLE_BLOCK: usize = MAX_TX_PER_BLOCK / 8;

/// Block header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash256,
    pub merkle_root: Hash256,
    /// Seconds since epoch.
    pub timestamp: u32,
    /// Compact difficulty target.
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    /// Version 1 header stamped with the current time.
    pub fn new(prev_block: Hash256, merkle_root: Hash256, bits: u32, nonce: u32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        Self {
            version: 1,
            prev_block,
            merkle_root,
            timestamp,
            bits,
            nonce,
        }
    }

    /// Double SHA-256 of the 80 header bytes.
    pub fn block_hash(&self) -> Hash256 {
        let mut dst = BytesMut::with_capacity(BLOCK_HEADER_SIZE);
        self.write_to(&mut dst);
        Hash256::hash(&dst)
    }

    pub(crate) fn write_to(&self, dst: &mut BytesMut) {
        dst.put_i32_le(self.version);
        write_hash(dst, &self.prev_block);
        write_hash(dst, &self.merkle_root);
        dst.put_u32_le(self.timestamp);
        dst.put_u32_le(self.bits);
        dst.put_u32_le(self.nonce);
    }

    pub(crate) fn read_from(buf: &mut Bytes) -> WireResult<Self> {
        Ok(Self {
            version: read_i32(buf, "header version")?,
            prev_block: read_hash(buf, "header prev block")?,
            merkle_root: read_hash(buf, "header merkle root")?,
            timestamp: read_u32(buf, "header timestamp")?,
            bits: read_u32(buf, "header bits")?,
            nonce: read_u32(buf, "header nonce")?,
        })
    }
}

fn check_locators(len: usize) -> WireResult<()> {
    if len > MAX_BLOCK_LOCATORS_PER_MSG {
        return Err(WireError::InvalidMessage(format!(
            "Too many block locator hashes: {} > {}",
            len, MAX_BLOCK_LOCATORS_PER_MSG
        )));
    }
    Ok(())
}

macro_rules! locator_message {
    ($(#[$doc:meta])* $name:ident, $command:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub protocol_version: u32,
            /// Hashes from the tip backwards, densest first.
            pub block_locator_hashes: Vec<Hash256>,
            /// Last hash wanted, or zero for as many as allowed.
            pub hash_stop: Hash256,
        }

        impl $name {
            pub fn new(hash_stop: Hash256) -> Self {
                Self {
                    protocol_version: crate::PROTOCOL_VERSION,
                    block_locator_hashes: Vec::new(),
                    hash_stop,
                }
            }

            pub fn add_block_locator_hash(&mut self, hash: Hash256) -> WireResult<()> {
                check_locators(self.block_locator_hashes.len() + 1)?;
                self.block_locator_hashes.push(hash);
                Ok(())
            }
        }

        impl WireMessage for $name {
            const COMMAND: &'static str = $command;

            fn encode(&self, dst: &mut BytesMut, _pver: u32) -> WireResult<()> {
                check_locators(self.block_locator_hashes.len())?;
                dst.put_u32_le(self.protocol_version);
                write_var_int(dst, self.block_locator_hashes.len() as u64);
                for hash in &self.block_locator_hashes {
                    write_hash(dst, hash);
                }
                write_hash(dst, &self.hash_stop);
                Ok(())
            }

            fn decode(buf: &mut Bytes, _pver: u32) -> WireResult<Self> {
                let protocol_version = read_u32(buf, "locator protocol version")?;
                let count = read_count(buf, MAX_BLOCK_LOCATORS_PER_MSG, "block locator hashes")?;
                let mut block_locator_hashes = Vec::with_capacity(count);
                for _ in 0..count {
                    block_locator_hashes.push(read_hash(buf, "block locator hash")?);
                }
                let hash_stop = read_hash(buf, "hash stop")?;
                Ok(Self {
                    protocol_version,
                    block_locator_hashes,
                    hash_stop,
                })
            }

            fn max_payload_length(_pver: u32) -> usize {
                4 + MAX_VAR_INT_PAYLOAD + MAX_BLOCK_LOCATORS_PER_MSG * 32 + 32
            }
        }
    };
}

locator_message!(
    /// Requests an `inv` of blocks after the locator.
    MsgGetBlocks,
    "getblocks"
);
locator_message!(
    /// Requests `headers` after the locator.
    MsgGetHeaders,
    "getheaders"
);

/// Block headers answering a `getheaders`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgHeaders {
    pub headers: Vec<BlockHeader>,
}

impl MsgHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block_header(&mut self, header: BlockHeader) -> WireResult<()> {
        if self.headers.len() + 1 > MAX_BLOCK_HEADERS_PER_MSG {
            return Err(WireError::InvalidMessage(format!(
                "Too many block headers in message [max {}]",
                MAX_BLOCK_HEADERS_PER_MSG
            )));
        }
        self.headers.push(header);
        Ok(())
    }
}

impl WireMessage for MsgHeaders {
    const COMMAND: &'static str = "headers";

    fn encode(&self, dst: &mut BytesMut, _pver: u32) -> WireResult<()> {
        if self.headers.len() > MAX_BLOCK_HEADERS_PER_MSG {
            return Err(WireError::InvalidMessage(format!(
                "Too many block headers: {} > {}",
                self.headers.len(),
                MAX_BLOCK_HEADERS_PER_MSG
            )));
        }
        write_var_int(dst, self.headers.len() as u64);
        for header in &self.headers {
            header.write_to(dst);
            // Headers are block messages with no transactions.
            write_var_int(dst, 0);
        }
        Ok(())
    }

    fn decode(buf: &mut Bytes, _pver: u32) -> WireResult<Self> {
        let count = read_count(buf, MAX_BLOCK_HEADERS_PER_MSG, "block headers")?;
        let mut headers = Vec::with_capacity(count);
        for _ in 0..count {
            let header = BlockHeader::read_from(buf)?;
            let tx_count = read_var_int(buf, "header transaction count")?;
            if tx_count > 0 {
                return Err(WireError::InvalidMessage(format!(
                    "Block headers may not contain transactions [count {}]",
                    tx_count
                )));
            }
            headers.push(header);
        }
        Ok(Self { headers })
    }

    fn max_payload_length(_pver: u32) -> usize {
        MAX_VAR_INT_PAYLOAD + MAX_BLOCK_HEADERS_PER_MSG * (BLOCK_HEADER_SIZE + 1)
    }
}

/// A full block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgBlock {
    pub header: BlockHeader,
    pub transactions: Vec<MsgTx>,
}

impl MsgBlock {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            transactions: Vec::new(),
        }
    }

    pub fn add_transaction(&mut self, tx: MsgTx) {
        self.transactions.push(tx);
    }

    pub fn block_hash(&self) -> Hash256 {
        self.header.block_hash()
    }
}

impl WireMessage for MsgBlock {
    const COMMAND: &'static str = "block";

    fn encode(&self, dst: &mut BytesMut, _pver: u32) -> WireResult<()> {
        self.header.write_to(dst);
        write_var_int(dst, self.transactions.len() as u64);
        for tx in &self.transactions {
            tx.write_to(dst);
        }
        Ok(())
    }

    fn decode(buf: &mut Bytes, _pver: u32) -> WireResult<Self> {
        let header = BlockHeader::read_from(buf)?;
        let count = read_count(buf, MAX_TX_PER_BLOCK, "block transactions")?;
        let mut transactions = Vec::with_capacity(count.min(buf.remaining() / MIN_TX_PAYLOAD));
        for _ in 0..count {
            transactions.push(MsgTx::read_from(buf)?);
        }
        Ok(Self {
            header,
            transactions,
        })
    }

    fn max_payload_length(_pver: u32) -> usize {
        MAX_BLOCK_PAYLOAD
    }
}

/// Filtered block with a partial merkle tree (BIP 37).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgMerkleBlock {
    pub header: BlockHeader,
    /// Number of transactions in the full block.
    pub transactions: u32,
    pub hashes: Vec<Hash256>,
    pub flags: Vec<u8>,
}

impl MsgMerkleBlock {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            ..Default::default()
        }
    }

    pub fn add_tx_hash(&mut self, hash: Hash256) -> WireResult<()> {
        if self.hashes.len() + 1 > MAX_TX_PER_BLOCK {
            return Err(WireError::InvalidMessage(format!(
                "Too many tx hashes for message [max {}]",
                MAX_TX_PER_BLOCK
            )));
        }
        self.hashes.push(hash);
        Ok(())
    }
}

impl WireMessage for MsgMerkleBlock {
    const COMMAND: &'static str = "merkleblock";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        require_version(Self::COMMAND, pver, BIP0037_VERSION)?;
        if self.hashes.len() > MAX_TX_PER_BLOCK {
            return Err(WireError::InvalidMessage(format!(
                "Too many transaction hashes: {} > {}",
                self.hashes.len(),
                MAX_TX_PER_BLOCK
            )));
        }
        if self.flags.len() > MAX_FLAGS_PER_MERKLE_BLOCK {
            return Err(WireError::InvalidMessage(format!(
                "Too many flag bytes: {} > {}",
                self.flags.len(),
                MAX_FLAGS_PER_MERKLE_BLOCK
            )));
        }

        self.header.write_to(dst);
        dst.put_u32_le(self.transactions);
        write_var_int(dst, self.hashes.len() as u64);
        for hash in &self.hashes {
            write_hash(dst, hash);
        }
        write_var_bytes(dst, &self.flags);
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        require_version(Self::COMMAND, pver, BIP0037_VERSION)?;

        let header = BlockHeader::read_from(buf)?;
        let transactions = read_u32(buf, "merkle block transactions")?;
        let count = read_count(buf, MAX_TX_PER_BLOCK, "merkle block hashes")?;
        let mut hashes = Vec::with_capacity(count.min(buf.remaining() / 32));
        for _ in 0..count {
            hashes.push(read_hash(buf, "merkle block hash")?);
        }
        let flags = read_var_bytes(buf, MAX_FLAGS_PER_MERKLE_BLOCK, "merkle block flags")?;
        Ok(Self {
            header,
            transactions,
            hashes,
            flags: flags.to_vec(),
        })
    }

    fn max_payload_length(_pver: u32) -> usize {
        MAX_BLOCK_PAYLOAD
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PROTOCOL_VERSION;

    fn genesis_header() -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block: Hash256::ZERO,
            merkle_root: "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b"
                .parse()
                .unwrap(),
            timestamp: 1_231_006_505,
            bits: 0x1d00_ffff,
            nonce: 2_083_236_893,
        }
    }

    #[test]
    fn test_genesis_block_hash() {
        assert_eq!(
            genesis_header().block_hash().to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_headers_reject_transactions() {
        let mut dst = BytesMut::new();
        write_var_int(&mut dst, 1);
        genesis_header().write_to(&mut dst);
        write_var_int(&mut dst, 1);
        assert!(MsgHeaders::decode(&mut dst.freeze(), PROTOCOL_VERSION).is_err());
    }

    #[test]
    fn test_headers_encoding() {
        let mut msg = MsgHeaders::new();
        msg.add_block_header(genesis_header()).unwrap();
        let mut dst = BytesMut::new();
        msg.encode(&mut dst, PROTOCOL_VERSION).unwrap();
        assert_eq!(dst.len(), 1 + BLOCK_HEADER_SIZE + 1);
        assert_eq!(MsgHeaders::decode(&mut dst.freeze(), PROTOCOL_VERSION).unwrap(), msg);
    }

    #[test]
    fn test_locator_limit() {
        let mut msg = MsgGetHeaders::new(Hash256::ZERO);
        for i in 0..MAX_BLOCK_LOCATORS_PER_MSG {
            msg.add_block_locator_hash(Hash256::hash(&i.to_le_bytes())).unwrap();
        }
        assert!(msg.add_block_locator_hash(Hash256::ZERO).is_err());

        let mut dst = BytesMut::new();
        msg.encode(&mut dst, PROTOCOL_VERSION).unwrap();
        assert_eq!(dst.len(), 4 + 3 + MAX_BLOCK_LOCATORS_PER_MSG * 32 + 32);
        assert_eq!(dst.len(), MsgGetHeaders::max_payload_length(PROTOCOL_VERSION) - 6);
    }

    #[test]
    fn test_merkle_block_version() {
        let msg = MsgMerkleBlock::new(genesis_header());
        let mut dst = BytesMut::new();
        assert!(msg.encode(&mut dst, BIP0037_VERSION - 1).is_err());
        msg.encode(&mut dst, BIP0037_VERSION).unwrap();
        assert_eq!(MsgMerkleBlock::decode(&mut dst.freeze(), BIP0037_VERSION).unwrap(), msg);
    }
}
