//! Transactions as carried by `tx` and `block` messages.
//!
//! Scripts are opaque byte strings; nothing here interprets them.

use crate::encode::{
    read_count, read_hash, read_i32, read_i64, read_u32, read_var_bytes, write_hash,
    write_var_bytes, write_var_int,
};
use crate::message::WireMessage;
use crate::{Hash256, WireResult, MAX_BLOCK_PAYLOAD, MAX_MESSAGE_PAYLOAD};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

/// Smallest possible input: outpoint (36) + empty script (1) + sequence (4).
const MIN_TX_IN_PAYLOAD: usize = 41;
/// Smallest possible output: value (8) + empty script (1).
const MIN_TX_OUT_PAYLOAD: usize = 9;
/// Smallest possible transaction: version, two counts, lock time.
pub(crate) const MIN_TX_PAYLOAD: usize = 10;

const MAX_TX_IN_PER_MESSAGE: usize = MAX_MESSAGE_PAYLOAD / MIN_TX_IN_PAYLOAD + 1;
const MAX_TX_OUT_PER_MESSAGE: usize = MAX_MESSAGE_PAYLOAD / MIN_TX_OUT_PAYLOAD + 1;

/// Reference to a previous transaction output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub hash: Hash256,
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: Hash256, index: u32) -> Self {
        Self { hash, index }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxIn {
    pub previous_out_point: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    /// Input with the maximum sequence number.
    pub fn new(previous_out_point: OutPoint, signature_script: Vec<u8>) -> Self {
        Self {
            previous_out_point,
            signature_script,
            sequence: u32::MAX,
        }
    }

    fn encode(&self, dst: &mut BytesMut) {
        write_hash(dst, &self.previous_out_point.hash);
        dst.put_u32_le(self.previous_out_point.index);
        write_var_bytes(dst, &self.signature_script);
        dst.put_u32_le(self.sequence);
    }

    fn decode(buf: &mut Bytes) -> WireResult<Self> {
        let hash = read_hash(buf, "outpoint hash")?;
        let index = read_u32(buf, "outpoint index")?;
        let signature_script = read_var_bytes(buf, MAX_MESSAGE_PAYLOAD, "signature script")?;
        let sequence = read_u32(buf, "input sequence")?;
        Ok(Self {
            previous_out_point: OutPoint { hash, index },
            signature_script: signature_script.to_vec(),
            sequence,
        })
    }

    fn serialize_size(&self) -> usize {
        40 + crate::var_int_size(self.signature_script.len() as u64) + self.signature_script.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOut {
    /// Amount in the smallest unit.
    pub value: i64,
    pub pk_script: Vec<u8>,
}

impl TxOut {
    pub fn new(value: i64, pk_script: Vec<u8>) -> Self {
        Self { value, pk_script }
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_i64_le(self.value);
        write_var_bytes(dst, &self.pk_script);
    }

    fn decode(buf: &mut Bytes) -> WireResult<Self> {
        let value = read_i64(buf, "output value")?;
        let pk_script = read_var_bytes(buf, MAX_MESSAGE_PAYLOAD, "public key script")?;
        Ok(Self {
            value,
            pk_script: pk_script.to_vec(),
        })
    }

    fn serialize_size(&self) -> usize {
        8 + crate::var_int_size(self.pk_script.len() as u64) + self.pk_script.len()
    }
}

/// A transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgTx {
    pub version: i32,
    pub tx_in: Vec<TxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
}

impl Default for MsgTx {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MsgTx {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            tx_in: Vec::new(),
            tx_out: Vec::new(),
            lock_time: 0,
        }
    }

    pub fn add_tx_in(&mut self, tx_in: TxIn) {
        self.tx_in.push(tx_in);
    }

    pub fn add_tx_out(&mut self, tx_out: TxOut) {
        self.tx_out.push(tx_out);
    }

    /// Double SHA-256 of the serialized transaction.
    pub fn tx_hash(&self) -> Hash256 {
        let mut dst = BytesMut::with_capacity(self.serialize_size());
        self.write_to(&mut dst);
        Hash256::hash(&dst)
    }

    /// Serialized length in bytes.
    pub fn serialize_size(&self) -> usize {
        8 + crate::var_int_size(self.tx_in.len() as u64)
            + crate::var_int_size(self.tx_out.len() as u64)
            + self.tx_in.iter().map(TxIn::serialize_size).sum::<usize>()
            + self.tx_out.iter().map(TxOut::serialize_size).sum::<usize>()
    }

    pub(crate) fn write_to(&self, dst: &mut BytesMut) {
        dst.put_i32_le(self.version);
        write_var_int(dst, self.tx_in.len() as u64);
        for tx_in in &self.tx_in {
            tx_in.encode(dst);
        }
        write_var_int(dst, self.tx_out.len() as u64);
        for tx_out in &self.tx_out {
            tx_out.encode(dst);
        }
        dst.put_u32_le(self.lock_time);
    }

    pub(crate) fn read_from(buf: &mut Bytes) -> WireResult<Self> {
        let version = read_i32(buf, "tx version")?;

        let count = read_count(buf, MAX_TX_IN_PER_MESSAGE, "transaction inputs")?;
        // Counts are attacker controlled; never preallocate past what the buffer can hold.
        let mut tx_in = Vec::with_capacity(count.min(buf.remaining() / MIN_TX_IN_PAYLOAD));
        for _ in 0..count {
            tx_in.push(TxIn::decode(buf)?);
        }

        let count = read_count(buf, MAX_TX_OUT_PER_MESSAGE, "transaction outputs")?;
        let mut tx_out = Vec::with_capacity(count.min(buf.remaining() / MIN_TX_OUT_PAYLOAD));
        for _ in 0..count {
            tx_out.push(TxOut::decode(buf)?);
        }

        let lock_time = read_u32(buf, "tx lock time")?;
        Ok(Self {
            version,
            tx_in,
            tx_out,
            lock_time,
        })
    }
}

impl WireMessage for MsgTx {
    const COMMAND: &'static str = "tx";

    fn encode(&self, dst: &mut BytesMut, _pver: u32) -> WireResult<()> {
        self.write_to(dst);
        Ok(())
    }

    fn decode(buf: &mut Bytes, _pver: u32) -> WireResult<Self> {
        Self::read_from(buf)
    }

    fn max_payload_length(_pver: u32) -> usize {
        MAX_BLOCK_PAYLOAD
    }
}
