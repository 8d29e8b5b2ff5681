//! The `addr` message relaying known peer addresses.

use crate::encode::{read_count, write_var_int};
use crate::message::WireMessage;
use crate::{NetAddress, WireError, WireResult, MAX_VAR_INT_PAYLOAD, MULTIPLE_ADDRESS_VERSION};
use bytes::{Bytes, BytesMut};

/// Maximum addresses in a single `addr` message.
pub const MAX_ADDR_PER_MSG: usize = 1000;

/// A list of known active peers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MsgAddr {
    pub addr_list: Vec<NetAddress>,
}

impl MsgAddr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an address, failing once the message is full.
    pub fn add_address(&mut self, addr: NetAddress) -> WireResult<()> {
        if self.addr_list.len() + 1 > MAX_ADDR_PER_MSG {
            return Err(WireError::InvalidMessage(format!(
                "Too many addresses in message [max {}]",
                MAX_ADDR_PER_MSG
            )));
        }
        self.addr_list.push(addr);
        Ok(())
    }

    pub fn clear_addresses(&mut self) {
        self.addr_list.clear();
    }
}

fn max_addresses(pver: u32) -> usize {
    if pver < MULTIPLE_ADDRESS_VERSION {
        1
    } else {
        MAX_ADDR_PER_MSG
    }
}

impl WireMessage for MsgAddr {
    const COMMAND: &'static str = "addr";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        let max = max_addresses(pver);
        if self.addr_list.len() > max {
            return Err(WireError::InvalidMessage(format!(
                "Too many addresses for message: {} > {}",
                self.addr_list.len(),
                max
            )));
        }

        write_var_int(dst, self.addr_list.len() as u64);
        for addr in &self.addr_list {
            addr.encode(dst, pver, true);
        }
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        let count = read_count(buf, max_addresses(pver), "addresses")?;
        let mut addr_list = Vec::with_capacity(count);
        for _ in 0..count {
            addr_list.push(NetAddress::decode(buf, pver, true)?);
        }
        Ok(Self { addr_list })
    }

    fn max_payload_length(pver: u32) -> usize {
        MAX_VAR_INT_PAYLOAD + max_addresses(pver) * NetAddress::max_payload(pver)
    }
}
