//! The protocol message set.

use crate::msg::require_version;
use crate::{
    MsgAddr, MsgAlert, MsgBlock, MsgFeeFilter, MsgFilterAdd, MsgFilterLoad, MsgGetBlocks,
    MsgGetData, MsgGetHeaders, MsgHeaders, MsgInv, MsgMerkleBlock, MsgNotFound, MsgPing, MsgPong,
    MsgReject, MsgTx, MsgVersion, WireError, WireResult, BIP0035_VERSION, BIP0037_VERSION,
    SEND_HEADERS_VERSION,
};
use bytes::{Bytes, BytesMut};

/// A message payload with a fixed command name and version-aware encoding.
pub trait WireMessage: Sized {
    /// Command name placed in the frame header.
    const COMMAND: &'static str;

    /// Append the payload for protocol version `pver`.
    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()>;

    /// Parse a payload written for protocol version `pver`.
    ///
    /// Bytes left over after the last field are ignored.
    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self>;

    /// Largest payload this message may have at `pver`.
    fn max_payload_length(pver: u32) -> usize;
}

pub(crate) const CMD_VERACK: &str = "verack";
pub(crate) const CMD_GETADDR: &str = "getaddr";
pub(crate) const CMD_MEMPOOL: &str = "mempool";
pub(crate) const CMD_FILTERCLEAR: &str = "filterclear";
pub(crate) const CMD_SENDHEADERS: &str = "sendheaders";

/// Every message a peer can send or receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Version(MsgVersion),
    VerAck,
    GetAddr,
    Addr(MsgAddr),
    Ping(MsgPing),
    Pong(MsgPong),
    Alert(MsgAlert),
    MemPool,
    Inv(MsgInv),
    GetData(MsgGetData),
    NotFound(MsgNotFound),
    GetBlocks(MsgGetBlocks),
    GetHeaders(MsgGetHeaders),
    Headers(MsgHeaders),
    Tx(MsgTx),
    Block(MsgBlock),
    MerkleBlock(MsgMerkleBlock),
    FilterAdd(MsgFilterAdd),
    FilterClear,
    FilterLoad(MsgFilterLoad),
    Reject(MsgReject),
    SendHeaders,
    FeeFilter(MsgFeeFilter),
    /// A well-framed message with a command this node does not know.
    Unknown { command: String, payload: Bytes },
}

impl Message {
    /// Command name as written in the frame header.
    pub fn command(&self) -> &str {
        match self {
            Message::Version(_) => MsgVersion::COMMAND,
            Message::VerAck => CMD_VERACK,
            Message::GetAddr => CMD_GETADDR,
            Message::Addr(_) => MsgAddr::COMMAND,
            Message::Ping(_) => MsgPing::COMMAND,
            Message::Pong(_) => MsgPong::COMMAND,
            Message::Alert(_) => MsgAlert::COMMAND,
            Message::MemPool => CMD_MEMPOOL,
            Message::Inv(_) => MsgInv::COMMAND,
            Message::GetData(_) => MsgGetData::COMMAND,
            Message::NotFound(_) => MsgNotFound::COMMAND,
            Message::GetBlocks(_) => MsgGetBlocks::COMMAND,
            Message::GetHeaders(_) => MsgGetHeaders::COMMAND,
            Message::Headers(_) => MsgHeaders::COMMAND,
            Message::Tx(_) => MsgTx::COMMAND,
            Message::Block(_) => MsgBlock::COMMAND,
            Message::MerkleBlock(_) => MsgMerkleBlock::COMMAND,
            Message::FilterAdd(_) => MsgFilterAdd::COMMAND,
            Message::FilterClear => CMD_FILTERCLEAR,
            Message::FilterLoad(_) => MsgFilterLoad::COMMAND,
            Message::Reject(_) => MsgReject::COMMAND,
            Message::SendHeaders => CMD_SENDHEADERS,
            Message::FeeFilter(_) => MsgFeeFilter::COMMAND,
            Message::Unknown { command, .. } => command,
        }
    }

    /// Largest payload this message may carry at `pver`.
    pub fn max_payload_length(&self, pver: u32) -> usize {
        match self {
            Message::Unknown { .. } => crate::MAX_MESSAGE_PAYLOAD,
            _ => max_payload_for(self.command(), pver).unwrap_or(crate::MAX_MESSAGE_PAYLOAD),
        }
    }

    /// Append the payload of this message encoded for `pver`.
    pub fn encode_payload(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        match self {
            Message::Version(m) => m.encode(dst, pver),
            Message::VerAck | Message::GetAddr => Ok(()),
            Message::Addr(m) => m.encode(dst, pver),
            Message::Ping(m) => m.encode(dst, pver),
            Message::Pong(m) => m.encode(dst, pver),
            Message::Alert(m) => m.encode(dst, pver),
            Message::MemPool => require_version(CMD_MEMPOOL, pver, BIP0035_VERSION),
            Message::Inv(m) => m.encode(dst, pver),
            Message::GetData(m) => m.encode(dst, pver),
            Message::NotFound(m) => m.encode(dst, pver),
            Message::GetBlocks(m) => m.encode(dst, pver),
            Message::GetHeaders(m) => m.encode(dst, pver),
            Message::Headers(m) => m.encode(dst, pver),
            Message::Tx(m) => m.encode(dst, pver),
            Message::Block(m) => m.encode(dst, pver),
            Message::MerkleBlock(m) => m.encode(dst, pver),
            Message::FilterAdd(m) => m.encode(dst, pver),
            Message::FilterClear => require_version(CMD_FILTERCLEAR, pver, BIP0037_VERSION),
            Message::FilterLoad(m) => m.encode(dst, pver),
            Message::Reject(m) => m.encode(dst, pver),
            Message::SendHeaders => require_version(CMD_SENDHEADERS, pver, SEND_HEADERS_VERSION),
            Message::FeeFilter(m) => m.encode(dst, pver),
            Message::Unknown { payload, .. } => {
                dst.extend_from_slice(payload);
                Ok(())
            }
        }
    }

    /// Parse the payload of a `command` message received at `pver`.
    ///
    /// Unknown commands are returned as [`Message::Unknown`] with the raw payload.
    pub fn decode_payload(command: &str, payload: Bytes, pver: u32) -> WireResult<Message> {
        if let Some(max) = max_payload_for(command, pver) {
            if payload.len() > max {
                return Err(WireError::PayloadTooLarge {
                    command: command.to_string(),
                    size: payload.len(),
                    max,
                });
            }
        }

        let mut buf = payload;
        let msg = match command {
            MsgVersion::COMMAND => Message::Version(MsgVersion::decode(&mut buf, pver)?),
            CMD_VERACK => Message::VerAck,
            CMD_GETADDR => Message::GetAddr,
            MsgAddr::COMMAND => Message::Addr(MsgAddr::decode(&mut buf, pver)?),
            MsgPing::COMMAND => Message::Ping(MsgPing::decode(&mut buf, pver)?),
            MsgPong::COMMAND => Message::Pong(MsgPong::decode(&mut buf, pver)?),
            MsgAlert::COMMAND => Message::Alert(MsgAlert::decode(&mut buf, pver)?),
            CMD_MEMPOOL => {
                require_version(CMD_MEMPOOL, pver, BIP0035_VERSION)?;
                Message::MemPool
            }
            MsgInv::COMMAND => Message::Inv(MsgInv::decode(&mut buf, pver)?),
            MsgGetData::COMMAND => Message::GetData(MsgGetData::decode(&mut buf, pver)?),
            MsgNotFound::COMMAND => Message::NotFound(MsgNotFound::decode(&mut buf, pver)?),
            MsgGetBlocks::COMMAND => Message::GetBlocks(MsgGetBlocks::decode(&mut buf, pver)?),
            MsgGetHeaders::COMMAND => Message::GetHeaders(MsgGetHeaders::decode(&mut buf, pver)?),
            MsgHeaders::COMMAND => Message::Headers(MsgHeaders::decode(&mut buf, pver)?),
            MsgTx::COMMAND => Message::Tx(MsgTx::decode(&mut buf, pver)?),
            MsgBlock::COMMAND => Message::Block(MsgBlock::decode(&mut buf, pver)?),
            MsgMerkleBlock::COMMAND => {
                Message::MerkleBlock(MsgMerkleBlock::decode(&mut buf, pver)?)
            }
            MsgFilterAdd::COMMAND => Message::FilterAdd(MsgFilterAdd::decode(&mut buf, pver)?),
            CMD_FILTERCLEAR => {
                require_version(CMD_FILTERCLEAR, pver, BIP0037_VERSION)?;
                Message::FilterClear
            }
            MsgFilterLoad::COMMAND => Message::FilterLoad(MsgFilterLoad::decode(&mut buf, pver)?),
            MsgReject::COMMAND => Message::Reject(MsgReject::decode(&mut buf, pver)?),
            CMD_SENDHEADERS => {
                require_version(CMD_SENDHEADERS, pver, SEND_HEADERS_VERSION)?;
                Message::SendHeaders
            }
            MsgFeeFilter::COMMAND => Message::FeeFilter(MsgFeeFilter::decode(&mut buf, pver)?),
            other => Message::Unknown {
                command: other.to_string(),
                payload: buf,
            },
        };
        Ok(msg)
    }
}

/// Per-command payload limit, `None` for unknown commands.
fn max_payload_for(command: &str, pver: u32) -> Option<usize> {
    let max = match command {
        MsgVersion::COMMAND => MsgVersion::max_payload_length(pver),
        CMD_VERACK | CMD_GETADDR | CMD_MEMPOOL | CMD_FILTERCLEAR | CMD_SENDHEADERS => 0,
        MsgAddr::COMMAND => MsgAddr::max_payload_length(pver),
        MsgPing::COMMAND => MsgPing::max_payload_length(pver),
        MsgPong::COMMAND => MsgPong::max_payload_length(pver),
        MsgAlert::COMMAND => MsgAlert::max_payload_length(pver),
        MsgInv::COMMAND => MsgInv::max_payload_length(pver),
        MsgGetData::COMMAND => MsgGetData::max_payload_length(pver),
        MsgNotFound::COMMAND => MsgNotFound::max_payload_length(pver),
        MsgGetBlocks::COMMAND => MsgGetBlocks::max_payload_length(pver),
        MsgGetHeaders::COMMAND => MsgGetHeaders::max_payload_length(pver),
        MsgHeaders::COMMAND => MsgHeaders::max_payload_length(pver),
        MsgTx::COMMAND => MsgTx::max_payload_length(pver),
        MsgBlock::COMMAND => MsgBlock::max_payload_length(pver),
        MsgMerkleBlock::COMMAND => MsgMerkleBlock::max_payload_length(pver),
        MsgFilterAdd::COMMAND => MsgFilterAdd::max_payload_length(pver),
        MsgFilterLoad::COMMAND => MsgFilterLoad::max_payload_length(pver),
        MsgReject::COMMAND => MsgReject::max_payload_length(pver),
        MsgFeeFilter::COMMAND => MsgFeeFilter::max_payload_length(pver),
        _ => return None,
    };
    Some(max)
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Message::Version(m) => write!(
                f,
                "version agent {}, pver {}, block {}",
                m.user_agent, m.protocol_version, m.last_block
            ),
            Message::Addr(m) => write!(f, "addr {} addresses", m.addr_list.len()),
            Message::Ping(m) => write!(f, "ping nonce {}", m.nonce),
            Message::Pong(m) => write!(f, "pong nonce {}", m.nonce),
            Message::Inv(m) => write!(f, "inv {} vectors", m.inv_list.len()),
            Message::GetData(m) => write!(f, "getdata {} vectors", m.inv_list.len()),
            Message::NotFound(m) => write!(f, "notfound {} vectors", m.inv_list.len()),
            Message::GetBlocks(m) => write!(
                f,
                "getblocks {} locators, stop {}",
                m.block_locator_hashes.len(),
                m.hash_stop
            ),
            Message::GetHeaders(m) => write!(
                f,
                "getheaders {} locators, stop {}",
                m.block_locator_hashes.len(),
                m.hash_stop
            ),
            Message::Headers(m) => write!(f, "headers {} headers", m.headers.len()),
            Message::Tx(m) => write!(f, "tx {}", m.tx_hash()),
            Message::Block(m) => write!(f, "block {}", m.block_hash()),
            Message::Reject(m) => write!(f, "reject {}", m),
            Message::FeeFilter(m) => write!(f, "feefilter {}", m.min_fee),
            other => f.write_str(other.command()),
        }
    }
}
