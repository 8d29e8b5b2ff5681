//! Codec tests against known frames and streamed input.

use crate::generators::{test_header, test_tx, test_version};
use bytes::BytesMut;
use colx_wire::{
    encode_frame, InvType, InvVect, Message, MessageCodec, MsgBlock, MsgInv, MsgPing, Network,
    WireError, MESSAGE_HEADER_SIZE, PROTOCOL_VERSION,
};
use futures::{SinkExt, StreamExt};
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite};

#[test]
fn test_empty_messages_are_bare_headers() {
    for msg in [
        Message::VerAck,
        Message::GetAddr,
        Message::MemPool,
        Message::FilterClear,
        Message::SendHeaders,
    ] {
        let frame = encode_frame(&msg, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();
        assert_eq!(frame.len(), MESSAGE_HEADER_SIZE, "{}", msg.command());
        assert_eq!(hex::encode(&frame[20..24]), "5df6e0e2");
    }
}

#[test]
fn test_decode_byte_by_byte() {
    let msg = Message::Tx(test_tx(3));
    let frame = encode_frame(&msg, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();

    let mut codec = MessageCodec::default();
    let mut src = BytesMut::new();
    let mut decoded = None;
    for (i, byte) in frame.iter().enumerate() {
        src.extend_from_slice(&[*byte]);
        if let Some(frame) = codec.decode(&mut src).unwrap() {
            assert_eq!(i, frame.wire_len - 1);
            decoded = Some(frame);
        }
    }

    let decoded = decoded.expect("complete frame");
    assert_eq!(decoded.message, msg);
    assert_eq!(decoded.wire_len, frame.len());
    assert!(src.is_empty());
}

#[test]
fn test_two_frames_in_one_buffer() {
    let magic = Network::Testnet3.magic();
    let mut src = BytesMut::new();
    src.extend_from_slice(&encode_frame(&Message::VerAck, PROTOCOL_VERSION, magic).unwrap());
    src.extend_from_slice(
        &encode_frame(&Message::Ping(MsgPing::new(9)), PROTOCOL_VERSION, magic).unwrap(),
    );

    let mut codec = MessageCodec::new(Network::Testnet3, PROTOCOL_VERSION);
    let first = codec.decode(&mut src).unwrap().unwrap();
    assert_eq!(first.message, Message::VerAck);
    assert_eq!(first.wire_len, MESSAGE_HEADER_SIZE);
    let second = codec.decode(&mut src).unwrap().unwrap();
    assert_eq!(second.message, Message::Ping(MsgPing::new(9)));
    assert_eq!(codec.last_command(), "ping");
    assert!(codec.decode(&mut src).unwrap().is_none());
}

#[test]
fn test_wrong_network_rejected() {
    let frame = encode_frame(&Message::VerAck, PROTOCOL_VERSION, Network::Regtest.magic()).unwrap();
    let mut codec = MessageCodec::new(Network::Mainnet, PROTOCOL_VERSION);
    let err = codec.decode(&mut BytesMut::from(&frame[..])).unwrap_err();
    assert!(matches!(err, WireError::MalformedHeader(_)));
    assert!(err.is_framing());
}

#[test]
fn test_encoder_matches_encode_frame() {
    let msg = Message::Version(test_version(1, 500));
    let mut codec = MessageCodec::default();
    let mut dst = BytesMut::new();
    codec.encode(msg.clone(), &mut dst).unwrap();
    assert_eq!(
        &dst[..],
        &encode_frame(&msg, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap()[..]
    );
}

#[tokio::test]
async fn test_framed_stream_roundtrip() {
    let (a, b) = tokio::io::duplex(1024 * 1024);
    let mut sink = FramedWrite::new(a, MessageCodec::new(Network::Simnet, PROTOCOL_VERSION));
    let mut stream = FramedRead::new(b, MessageCodec::new(Network::Simnet, PROTOCOL_VERSION));

    let mut block = MsgBlock::new(test_header(4));
    block.add_transaction(test_tx(4));
    block.add_transaction(test_tx(5));
    let mut inv = MsgInv::new();
    inv.add_inv_vect(InvVect::new(InvType::Block, block.block_hash()))
        .unwrap();

    let messages = vec![
        Message::Version(test_version(2, 10)),
        Message::VerAck,
        Message::Inv(inv),
        Message::Block(block),
        Message::SendHeaders,
    ];
    for msg in &messages {
        sink.send(msg.clone()).await.unwrap();
    }

    for expected in messages {
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.message, expected);
    }
}
