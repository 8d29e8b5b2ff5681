//! Message framing.
//!
//! Every message travels in a frame:
//!
//! ```text
//! +----------+--------------+----------+----------+
//! |  Magic   |   Command    |  Length  | Checksum |
//! | 4 bytes  |   12 bytes   | 4 bytes  | 4 bytes  |
//! +----------+--------------+----------+----------+
//! |                   Payload                     |
//! |                (Length bytes)                 |
//! +-----------------------------------------------+
//! ```
//!
//! - Magic: network identifier, little-endian
//! - Command: ASCII name, NUL padded
//! - Length: payload length, little-endian
//! - Checksum: first 4 bytes of SHA256(SHA256(payload))

use crate::{
    double_sha256, Message, Network, WireError, WireResult, MAX_MESSAGE_PAYLOAD, PROTOCOL_VERSION,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Header size: magic (4) + command (12) + length (4) + checksum (4).
pub const MESSAGE_HEADER_SIZE: usize = 24;

const COMMAND_SIZE: usize = 12;

/// First 4 bytes of the double SHA-256 of `payload`.
pub fn checksum(payload: &[u8]) -> [u8; 4] {
    let hash = double_sha256(payload);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&hash[0..4]);
    checksum
}

/// Encode `msg` into a complete frame for protocol version `pver`.
///
/// Fails when the payload exceeds the message's own limit or the global one.
pub fn encode_frame(msg: &Message, pver: u32, magic: u32) -> WireResult<Bytes> {
    let command = msg.command();
    if command.len() > COMMAND_SIZE || !command.is_ascii() {
        return Err(WireError::InvalidMessage(format!(
            "Command {:?} does not fit the frame header",
            command
        )));
    }

    let mut payload = BytesMut::new();
    msg.encode_payload(&mut payload, pver)?;

    let max = msg.max_payload_length(pver).min(MAX_MESSAGE_PAYLOAD);
    if payload.len() > max {
        return Err(WireError::PayloadTooLarge {
            command: command.to_string(),
            size: payload.len(),
            max,
        });
    }

    let mut dst = BytesMut::with_capacity(MESSAGE_HEADER_SIZE + payload.len());
    dst.put_u32_le(magic);
    let mut name = [0u8; COMMAND_SIZE];
    name[..command.len()].copy_from_slice(command.as_bytes());
    dst.put_slice(&name);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(&checksum(&payload));
    dst.put_slice(&payload);
    Ok(dst.freeze())
}

/// A decoded message with the number of bytes it occupied on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub message: Message,
    /// Header plus payload.
    pub wire_len: usize,
}

/// Framing codec for peer connections.
///
/// The protocol version starts at [`PROTOCOL_VERSION`] and is lowered once the
/// handshake negotiates a common version.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    magic: u32,
    protocol_version: u32,
    last_command: String,
}

impl MessageCodec {
    /// Create a codec for `network`.
    pub fn new(network: Network, protocol_version: u32) -> Self {
        Self::with_magic(network.magic(), protocol_version)
    }

    /// Create a codec with custom magic.
    pub fn with_magic(magic: u32, protocol_version: u32) -> Self {
        Self {
            magic,
            protocol_version,
            last_command: String::new(),
        }
    }

    pub fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    /// Switch encoding rules, typically after version negotiation.
    pub fn set_protocol_version(&mut self, pver: u32) {
        self.protocol_version = pver;
    }

    /// Command of the most recent header that passed validation. Lets callers
    /// name the message whose payload failed to decode.
    pub fn last_command(&self) -> &str {
        &self.last_command
    }
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(Network::Mainnet, PROTOCOL_VERSION)
    }
}

fn parse_command(raw: &[u8]) -> WireResult<String> {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    let (name, padding) = raw.split_at(end);
    if padding.iter().any(|b| *b != 0) {
        return Err(WireError::MalformedHeader(
            "Command is not NUL padded".to_string(),
        ));
    }
    if !name.iter().all(|b| b.is_ascii_graphic()) {
        return Err(WireError::MalformedHeader(format!(
            "Invalid command bytes {}",
            hex::encode(raw)
        )));
    }
    Ok(String::from_utf8_lossy(name).to_string())
}

impl Decoder for MessageCodec {
    type Item = Frame;
    type Error = WireError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MESSAGE_HEADER_SIZE {
            return Ok(None);
        }

        // Parse header without consuming
        let magic = u32::from_le_bytes([src[0], src[1], src[2], src[3]]);
        if magic != self.magic {
            return Err(WireError::MalformedHeader(format!(
                "Invalid magic: expected {:#010x}, got {:#010x}",
                self.magic, magic
            )));
        }

        let command = parse_command(&src[4..16])?;
        self.last_command.clone_from(&command);
        let length = u32::from_le_bytes([src[16], src[17], src[18], src[19]]) as usize;
        let expected: [u8; 4] = [src[20], src[21], src[22], src[23]];

        if length > MAX_MESSAGE_PAYLOAD {
            return Err(WireError::MalformedHeader(format!(
                "Payload of {} is {} bytes, max {}",
                command, length, MAX_MESSAGE_PAYLOAD
            )));
        }

        let total_size = MESSAGE_HEADER_SIZE + length;
        if src.len() < total_size {
            src.reserve(total_size - src.len());
            return Ok(None);
        }

        src.advance(MESSAGE_HEADER_SIZE);
        let payload = src.split_to(length).freeze();

        let actual = checksum(&payload);
        if actual != expected {
            return Err(WireError::ChecksumMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            });
        }

        let message = Message::decode_payload(&command, payload, self.protocol_version)?;
        Ok(Some(Frame {
            message,
            wire_len: total_size,
        }))
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = WireError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let frame = encode_frame(&item, self.protocol_version, self.magic)?;
        dst.extend_from_slice(&frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MsgPing, MsgVersion, NetAddress};

    #[test]
    fn test_checksum() {
        assert_eq!(hex::encode(checksum(&[])), "5df6e0e2");
    }

    #[test]
    fn test_getaddr_frame() {
        let frame = encode_frame(&Message::GetAddr, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();
        assert_eq!(
            hex::encode(&frame),
            "f9beb4d9676574616464720000000000000000005df6e0e2"
        );
    }

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = MessageCodec::default();
        let msg = Message::Version(MsgVersion::new(NetAddress::default(), NetAddress::default(), 7, 100));

        let mut buf = BytesMut::new();
        codec.encode(msg.clone(), &mut buf).unwrap();
        let len = buf.len();

        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.message, msg);
        assert_eq!(frame.wire_len, len);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_frame() {
        let mut codec = MessageCodec::default();
        let full = encode_frame(&Message::Ping(MsgPing::new(9)), PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();

        let mut buf = BytesMut::from(&full[..10]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&full[10..30]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&full[30..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.message, Message::Ping(MsgPing::new(9)));
    }

    #[test]
    fn test_wrong_magic() {
        let mut codec = MessageCodec::new(Network::Testnet3, PROTOCOL_VERSION);
        let frame = encode_frame(&Message::VerAck, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();
        let err = codec.decode(&mut BytesMut::from(&frame[..])).unwrap_err();
        assert!(matches!(err, WireError::MalformedHeader(_)));
    }

    #[test]
    fn test_bad_checksum() {
        let mut codec = MessageCodec::default();
        let frame = encode_frame(&Message::Ping(MsgPing::new(1)), PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();
        let mut bytes = BytesMut::from(&frame[..]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        let err = codec.decode(&mut bytes).unwrap_err();
        assert!(matches!(err, WireError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_oversized_length() {
        let mut codec = MessageCodec::default();
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(Network::Mainnet.magic());
        bytes.put_slice(b"block\0\0\0\0\0\0\0");
        bytes.put_u32_le(MAX_MESSAGE_PAYLOAD as u32 + 1);
        bytes.put_slice(&[0; 4]);
        assert!(matches!(codec.decode(&mut bytes), Err(WireError::MalformedHeader(_))));
    }

    #[test]
    fn test_bad_command_padding() {
        let mut codec = MessageCodec::default();
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(Network::Mainnet.magic());
        bytes.put_slice(b"ping\0x\0\0\0\0\0\0");
        bytes.put_u32_le(0);
        bytes.put_slice(&checksum(&[]));
        assert!(matches!(codec.decode(&mut bytes), Err(WireError::MalformedHeader(_))));
    }

    #[test]
    fn test_per_message_limit() {
        let mut codec = MessageCodec::default();
        let payload = [0u8; 9];
        let mut bytes = BytesMut::new();
        bytes.put_u32_le(Network::Mainnet.magic());
        bytes.put_slice(b"ping\0\0\0\0\0\0\0\0");
        bytes.put_u32_le(payload.len() as u32);
        bytes.put_slice(&checksum(&payload));
        bytes.put_slice(&payload);
        let err = codec.decode(&mut bytes).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge { max: 8, .. }));
        assert!(!err.is_framing());
        assert_eq!(codec.last_command(), "ping");
    }
}
