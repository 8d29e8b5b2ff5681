//! Keepalive messages (`ping` / `pong`, BIP 31).

use crate::encode::read_u64;
use crate::message::WireMessage;
use crate::{WireError, WireResult, BIP0031_VERSION};
use bytes::{BufMut, Bytes, BytesMut};

/// Keepalive request. The nonce only exists after BIP 31.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgPing {
    pub nonce: u64,
}

impl MsgPing {
    pub fn new(nonce: u64) -> Self {
        Self { nonce }
    }
}

impl WireMessage for MsgPing {
    const COMMAND: &'static str = "ping";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        if pver > BIP0031_VERSION {
            dst.put_u64_le(self.nonce);
        }
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        let nonce = if pver > BIP0031_VERSION {
            read_u64(buf, "ping nonce")?
        } else {
            0
        };
        Ok(Self { nonce })
    }

    fn max_payload_length(pver: u32) -> usize {
        if pver > BIP0031_VERSION {
            8
        } else {
            0
        }
    }
}

/// Reply to a [`MsgPing`] echoing its nonce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgPong {
    pub nonce: u64,
}

impl MsgPong {
    pub fn new(nonce: u64) -> Self {
        Self { nonce }
    }
}

fn pong_supported(pver: u32) -> WireResult<()> {
    if pver <= BIP0031_VERSION {
        return Err(WireError::UnsupportedVersion {
            command: MsgPong::COMMAND.to_string(),
            version: pver,
        });
    }
    Ok(())
}

impl WireMessage for MsgPong {
    const COMMAND: &'static str = "pong";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        pong_supported(pver)?;
        dst.put_u64_le(self.nonce);
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        pong_supported(pver)?;
        Ok(Self {
            nonce: read_u64(buf, "pong nonce")?,
        })
    }

    fn max_payload_length(pver: u32) -> usize {
        if pver > BIP0031_VERSION {
            8
        } else {
            0
        }
    }
}
