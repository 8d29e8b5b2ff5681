//! The `version` message opening every handshake.

use crate::encode::{read_i32, read_i64, read_u64, read_u8, read_var_string, write_var_string};
use crate::message::WireMessage;
use crate::{
    NetAddress, ServiceFlags, WireError, WireResult, BIP0037_VERSION, DEFAULT_USER_AGENT,
    MAX_VAR_INT_PAYLOAD, PROTOCOL_VERSION,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum length of the user agent string.
pub const MAX_USER_AGENT_LEN: usize = 256;

/// Announces a node's version, services and best height to a remote peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgVersion {
    /// Protocol version the sender speaks.
    pub protocol_version: i32,
    /// Services the sender offers.
    pub services: ServiceFlags,
    /// Sender clock (seconds since epoch).
    pub timestamp: i64,
    /// Address of the receiving node as seen by the sender.
    pub addr_you: NetAddress,
    /// Address of the sending node.
    pub addr_me: NetAddress,
    /// Random nonce used to detect self connections.
    pub nonce: u64,
    /// User agent (BIP 14 format).
    pub user_agent: String,
    /// Sender's best block height.
    pub last_block: i32,
    /// Whether the sender asks not to be sent transactions until a filter is loaded.
    pub disable_relay_tx: bool,
}

impl MsgVersion {
    /// Create a version message stamped with the current time.
    pub fn new(addr_me: NetAddress, addr_you: NetAddress, nonce: u64, last_block: i32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        Self {
            protocol_version: PROTOCOL_VERSION as i32,
            services: ServiceFlags::NONE,
            timestamp,
            addr_you,
            addr_me,
            nonce,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            last_block,
            disable_relay_tx: false,
        }
    }

    /// Append `name:version(comments)/` to the user agent.
    pub fn add_user_agent(&mut self, name: &str, version: &str, comments: &[&str]) -> WireResult<()> {
        let mut agent = format!("{}:{}", name, version);
        if !comments.is_empty() {
            agent = format!("{}({})", agent, comments.join("; "));
        }
        let user_agent = format!("{}{}/", self.user_agent, agent);
        validate_user_agent(&user_agent)?;
        self.user_agent = user_agent;
        Ok(())
    }

    /// Whether the sender advertises `service`.
    pub fn has_service(&self, service: ServiceFlags) -> bool {
        self.services.has(service)
    }

    /// Advertise `service`.
    pub fn add_service(&mut self, service: ServiceFlags) {
        self.services = self.services | service;
    }
}

fn validate_user_agent(user_agent: &str) -> WireResult<()> {
    if user_agent.len() > MAX_USER_AGENT_LEN {
        return Err(WireError::InvalidMessage(format!(
            "User agent too long: {} > {}",
            user_agent.len(),
            MAX_USER_AGENT_LEN
        )));
    }
    Ok(())
}

impl WireMessage for MsgVersion {
    const COMMAND: &'static str = "version";

    fn encode(&self, dst: &mut BytesMut, pver: u32) -> WireResult<()> {
        validate_user_agent(&self.user_agent)?;

        dst.put_i32_le(self.protocol_version);
        dst.put_u64_le(self.services.0);
        dst.put_i64_le(self.timestamp);
        self.addr_you.encode(dst, pver, false);
        self.addr_me.encode(dst, pver, false);
        dst.put_u64_le(self.nonce);
        write_var_string(dst, &self.user_agent);
        dst.put_i32_le(self.last_block);
        if pver >= BIP0037_VERSION {
            dst.put_u8(u8::from(!self.disable_relay_tx));
        }
        Ok(())
    }

    fn decode(buf: &mut Bytes, pver: u32) -> WireResult<Self> {
        let protocol_version = read_i32(buf, "version protocol")?;
        let services = ServiceFlags(read_u64(buf, "version services")?);
        let timestamp = read_i64(buf, "version timestamp")?;
        let addr_you = NetAddress::decode(buf, pver, false)?;

        // Everything after addr_you was added over time and may be absent.
        let addr_me = if buf.has_remaining() {
            NetAddress::decode(buf, pver, false)?
        } else {
            NetAddress::default()
        };
        let nonce = if buf.has_remaining() {
            read_u64(buf, "version nonce")?
        } else {
            0
        };
        let user_agent = if buf.has_remaining() {
            let ua = read_var_string(buf, MAX_USER_AGENT_LEN, "user agent")?;
            validate_user_agent(&ua)?;
            ua
        } else {
            String::new()
        };
        let last_block = if buf.has_remaining() {
            read_i32(buf, "version last block")?
        } else {
            0
        };
        let disable_relay_tx = if buf.has_remaining() {
            read_u8(buf, "version relay")? == 0
        } else {
            false
        };

        Ok(Self {
            protocol_version,
            services,
            timestamp,
            addr_you,
            addr_me,
            nonce,
            user_agent,
            last_block,
            disable_relay_tx,
        })
    }

    fn max_payload_length(pver: u32) -> usize {
        // protocol 4 + services 8 + timestamp 8 + nonce 8 + last block 4 + relay 1
        33 + NetAddress::max_payload(pver) * 2 + MAX_VAR_INT_PAYLOAD + MAX_USER_AGENT_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BIP0037_VERSION, NET_ADDRESS_TIME_VERSION};

    fn sample() -> MsgVersion {
        let me = NetAddress::new("127.0.0.1:8333".parse().unwrap(), ServiceFlags::NODE_NETWORK);
        let you = NetAddress::new("192.168.0.1:8333".parse().unwrap(), ServiceFlags::NODE_NETWORK);
        let mut msg = MsgVersion::new(me, you, 123_123, 234_234);
        // Addresses inside version messages carry no timestamp.
        msg.addr_me.timestamp = 0;
        msg.addr_you.timestamp = 0;
        msg.add_service(ServiceFlags::NODE_NETWORK);
        msg
    }

    #[test]
    fn test_user_agent() {
        let mut msg = sample();
        msg.add_user_agent("peer", "1.0", &[]).unwrap();
        assert_eq!(msg.user_agent, "/btcwire:0.5.0/peer:1.0/");

        msg.add_user_agent("ext", "2", &["a", "b"]).unwrap();
        assert_eq!(msg.user_agent, "/btcwire:0.5.0/peer:1.0/ext:2(a; b)/");

        let long = "x".repeat(MAX_USER_AGENT_LEN);
        assert!(msg.add_user_agent(&long, "1", &[]).is_err());
    }

    #[test]
    fn test_version_size() {
        let mut msg = sample();
        msg.add_user_agent("peer", "1.0", &[]).unwrap();
        let mut dst = BytesMut::new();
        msg.encode(&mut dst, PROTOCOL_VERSION).unwrap();
        assert_eq!(dst.len(), 110);
    }

    #[test]
    fn test_relay_flag_gated_by_version() {
        let mut msg = sample();
        msg.disable_relay_tx = true;

        let mut dst = BytesMut::new();
        msg.encode(&mut dst, BIP0037_VERSION).unwrap();
        let decoded = MsgVersion::decode(&mut dst.freeze(), BIP0037_VERSION).unwrap();
        assert!(decoded.disable_relay_tx);

        let mut dst = BytesMut::new();
        msg.encode(&mut dst, BIP0037_VERSION - 1).unwrap();
        let decoded = MsgVersion::decode(&mut dst.freeze(), BIP0037_VERSION - 1).unwrap();
        assert!(!decoded.disable_relay_tx);
    }

    #[test]
    fn test_optional_fields() {
        let msg = sample();
        let mut dst = BytesMut::new();
        msg.encode(&mut dst, NET_ADDRESS_TIME_VERSION).unwrap();

        // Cut after addr_you: 4 + 8 + 8 + 26 bytes.
        let truncated = dst.freeze().slice(..46);
        let decoded = MsgVersion::decode(&mut truncated.clone(), NET_ADDRESS_TIME_VERSION).unwrap();
        assert_eq!(decoded.addr_you, msg.addr_you);
        assert_eq!(decoded.nonce, 0);
        assert!(decoded.user_agent.is_empty());
        assert_eq!(decoded.last_block, 0);
    }

    #[test]
    fn test_truncated_required_fields() {
        let msg = sample();
        let mut dst = BytesMut::new();
        msg.encode(&mut dst, PROTOCOL_VERSION).unwrap();
        let truncated = dst.freeze().slice(..30);
        assert!(MsgVersion::decode(&mut truncated.clone(), PROTOCOL_VERSION).is_err());
    }
}
