//! The `reject` message (BIP 61).

use crate::encode::{read_hash, read_u8, read_var_string, write_hash, write_var_string};
use crate::message::WireMessage;
use crate::msg::require_version;
use crate::{Hash256, WireResult, MAX_MESSAGE_PAYLOAD, REJECT_VERSION};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Why a message was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectCode {
    Malformed,
    Invalid,
    Obsolete,
    Duplicate,
    Nonstandard,
    Dust,
    InsufficientFee,
    Checkpoint,
    Other(u8),
}

impl RejectCode {
    pub fn as_u8(&self) -> u8 {
        match self {
            RejectCode::Malformed => 0x01,
            RejectCode::Invalid => 0x10,
            RejectCode::Obsolete => 0x11,
            RejectCode::Duplicate => 0x12,
            RejectCode::Nonstandard => 0x40,
            RejectCode::Dust => 0x41,
            RejectCode::InsufficientFee => 0x42,
            RejectCode::Checkpoint => 0x43,
            RejectCode::Other(code) => *code,
        }
    }
}

impl From<u8> for RejectCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => RejectCode::Malformed,
            0x10 => RejectCode::Invalid,
            0x11 => RejectCode::Obsolete,
            0x12 => RejectCode::Duplicate,
            0x40 => RejectCode::Nonstandard,
            0x41 => RejectCode::Dust,
            0x42 => RejectCode::InsufficientFee,
            0x43 => RejectCode::Checkpoint,
            other => RejectCode::Other(other),
        }
    }
}

impl fmt::Display for RejectCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectCode::Malformed => f.write_str("REJECT_MALFORMED"),
            RejectCode::Invalid => f.write_str("REJECT_INVALID"),
            RejectCode::Obsolete => f.write_str("REJECT_OBSOLETE"),
            RejectCode::Duplicate => f.write_str("REJECT_DUPLICATE"),
            RejectCode::Nonstandard => f.write_str("REJECT_NONSTANDARD"),
            RejectCode::Dust => f.write_str("REJECT_DUST"),
            RejectCode::InsufficientFee => f.write_str("REJECT_INSUFFICIENTFEE"),
            RejectCode::Checkpoint => f.write_str("REJECT_CHECKPOINT"),
            RejectCode::Other(code) => write!(f, "Unknown RejectCode ({})", code),
        }
    }
}

/// Tells a peer that one of its messages was rejected.
///
/// `hash` travels on the wire only when `cmd` is `block` or `tx`; encoding a
/// block/tx reject without a hash writes the zero hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgReject {
    /// Command of the rejected message.
    pub cmd: String,
    pub code: RejectCode,
    /// Human readable reason.
    pub reason: String,
    /// Hash of the rejected block or transaction.
    pub hash: Option<Hash256>,
}

impl MsgReject {
    pub fn new(cmd: impl Into<String>, code: RejectCode, reason: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            code,
            reason: reason.into(),
            hash: None,
        }
    }

    /// Whether rejects of `cmd` carry the object hash.
    pub fn carries_hash(cmd: &str) -> bool {
        cmd == "block" || cmd == "tx"
    }
}

impl fmt::Display for MsgReject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd {}, code {}, reason {}", self.cmd, self.code, self.reason)?;
        if let Some(hash) = &self.hash {
            write!(f, ", hash {}", hash)?;
        }
        Ok(())
    }
}

impl WireMessage for MsgReject {
    const COMMAND: &'static str = "reject";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        require_version(Self::COMMAND, pver, REJECT_VERSION)?;

        write_var_string(dst, &self.cmd);
        dst.put_u8(self.code.as_u8());
        write_var_string(dst, &self.reason);
        if Self::carries_hash(&self.cmd) {
            write_hash(dst, &self.hash.unwrap_or(Hash256::ZERO));
        }
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        require_version(Self::COMMAND, pver, REJECT_VERSION)?;

        let cmd = read_var_string(buf, MAX_MESSAGE_PAYLOAD, "reject command")?;
        let code = RejectCode::from(read_u8(buf, "reject code")?);
        let reason = read_var_string(buf, MAX_MESSAGE_PAYLOAD, "reject reason")?;
        let hash = if Self::carries_hash(&cmd) {
            Some(read_hash(buf, "reject hash")?)
        } else {
            None
        };
        Ok(Self {
            cmd,
            code,
            reason,
            hash,
        })
    }

    fn max_payload_length(_pver: u32) -> usize {
        MAX_MESSAGE_PAYLOAD
    }
}
