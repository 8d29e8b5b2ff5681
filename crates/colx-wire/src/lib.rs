//! # colx-wire
//!
//! Wire protocol for the ColossusXT peer network, a Bitcoin-derived chain.
//!
//! This crate provides:
//! - Message framing (magic, command, length, checksum, payload)
//! - Every protocol message with version-aware encoding
//! - Network parameters, service flags and inventory vectors
//! - A `tokio_util` codec for framed transports

mod codec;
mod encode;
mod error;
mod hash;
mod inventory;
mod message;
mod msg;
mod netaddress;
mod network;

pub use codec::{checksum, encode_frame, Frame, MessageCodec, MESSAGE_HEADER_SIZE};
pub use encode::{var_int_size, MAX_VAR_INT_PAYLOAD};
pub use error::{WireError, WireResult};
pub use hash::{double_sha256, Hash256};
pub use inventory::{InvType, InvVect, INV_VECT_SIZE, MAX_INV_PER_MSG};
pub use message::{Message, WireMessage};
pub use msg::{
    BlockHeader, BloomUpdateType, MsgAddr, MsgAlert, MsgBlock, MsgFeeFilter, MsgFilterAdd,
    MsgFilterLoad, MsgGetBlocks, MsgGetData, MsgGetHeaders, MsgHeaders, MsgInv, MsgMerkleBlock,
    MsgNotFound, MsgPing, MsgPong, MsgReject, MsgTx, MsgVersion, OutPoint, RejectCode, TxIn,
    TxOut, BLOCK_HEADER_SIZE, MAX_ADDR_PER_MSG, MAX_BLOCK_HEADERS_PER_MSG, MAX_BLOCK_LOCATORS_PER_MSG,
    MAX_FILTER_ADD_DATA_SIZE, MAX_FILTER_LOAD_FILTER_SIZE, MAX_FILTER_LOAD_HASH_FUNCS,
    MAX_USER_AGENT_LEN,
};
pub use netaddress::NetAddress;
pub use network::{Network, ServiceFlags};

/// Maximum payload of any single message (32 MiB).
pub const MAX_MESSAGE_PAYLOAD: usize = 32 * 1024 * 1024;

/// Maximum serialized size of a block or transaction.
pub const MAX_BLOCK_PAYLOAD: usize = 1_000_000;

/// Latest protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: u32 = FEE_FILTER_VERSION;

/// First version where a `version` message may announce more than one address.
pub const MULTIPLE_ADDRESS_VERSION: u32 = 209;

/// First version where network addresses carry a timestamp.
pub const NET_ADDRESS_TIME_VERSION: u32 = 31402;

/// First version where `pong` exists and `ping` carries a nonce (BIP 31).
pub const BIP0031_VERSION: u32 = 60000;

/// First version supporting the `mempool` message (BIP 35).
pub const BIP0035_VERSION: u32 = 60002;

/// First version supporting bloom filtering and the relay flag (BIP 37).
pub const BIP0037_VERSION: u32 = 70001;

/// First version supporting the `reject` message.
pub const REJECT_VERSION: u32 = 70002;

/// First version where bloom filtering is negotiated through a service bit (BIP 111).
pub const BIP0111_VERSION: u32 = 70011;

/// First version supporting the `sendheaders` message.
pub const SEND_HEADERS_VERSION: u32 = 70012;

/// First version supporting the `feefilter` message.
pub const FEE_FILTER_VERSION: u32 = 70013;

/// User agent prefix placed in front of every application user agent.
pub const DEFAULT_USER_AGENT: &str = "/btcwire:0.5.0/";
