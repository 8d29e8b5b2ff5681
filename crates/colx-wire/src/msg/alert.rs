//! Opaque `alert` messages and the BIP 133 `feefilter`.

use crate::encode::{read_i64, read_var_bytes, write_var_bytes};
use crate::message::WireMessage;
use crate::msg::require_version;
use crate::{WireResult, FEE_FILTER_VERSION, MAX_MESSAGE_PAYLOAD};
use bytes::{BufMut, Bytes, BytesMut};

/// Signed network alert. Payload and signature are carried verbatim and
/// never verified here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgAlert {
    pub serialized_payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl MsgAlert {
    pub fn new(serialized_payload: Vec<u8>, signature: Vec<u8>) -> Self {
        Self {
            serialized_payload,
            signature,
        }
    }
}

impl WireMessage for MsgAlert {
    const COMMAND: &'static str = "alert";

    fn encode(&self, dst: &mut BytesMut, _pver: u32) -> WireResult<()> {
        write_var_bytes(dst, &self.serialized_payload);
        write_var_bytes(dst, &self.signature);
        Ok(())
    }

    fn decode(buf: &mut Bytes, _pver: u32) -> WireResult<Self> {
        let serialized_payload = read_var_bytes(buf, MAX_MESSAGE_PAYLOAD, "alert payload")?;
        let signature = read_var_bytes(buf, MAX_MESSAGE_PAYLOAD, "alert signature")?;
        Ok(Self {
            serialized_payload: serialized_payload.to_vec(),
            signature: signature.to_vec(),
        })
    }

    fn max_payload_length(_pver: u32) -> usize {
        MAX_MESSAGE_PAYLOAD
    }
}

/// Minimum fee rate (satoshi per kB) below which the sender does not want
/// transactions announced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsgFeeFilter {
    pub min_fee: i64,
}

impl MsgFeeFilter {
    pub fn new(min_fee: i64) -> Self {
        Self { min_fee }
    }
}

impl WireMessage for MsgFeeFilter {
    const COMMAND: &'static str = "feefilter";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        require_version(Self::COMMAND, pver, FEE_FILTER_VERSION)?;
        dst.put_i64_le(self.min_fee);
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        require_version(Self::COMMAND, pver, FEE_FILTER_VERSION)?;
        Ok(Self {
            min_fee: read_i64(buf, "fee filter")?,
        })
    }

    fn max_payload_length(_pver: u32) -> usize {
        8
    }
}
