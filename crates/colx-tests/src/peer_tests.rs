//! Session tests between two peers over in-memory transports.

use crate::generators::{test_address, test_hash, test_locator, test_version};
use crate::harness::{
    connected_pair, next_event, pipe, test_config, wait_until, Event, HungConn, MockConn,
    RecordingListener, StuckShutdownConn, WAIT,
};
use bytes::{BufMut, BytesMut};
use colx_peer::{
    HandshakeState, NonceRegistry, Peer, PeerConfig, PeerError, NONCE_REGISTRY_CAPACITY,
};
use colx_wire::{
    checksum, encode_frame, Hash256, InvType, InvVect, Message, MessageCodec, MsgPing, Network,
    RejectCode, ServiceFlags, PROTOCOL_VERSION,
};
use futures::StreamExt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio_util::codec::FramedRead;

/// Version frame (134 bytes with a 24-byte user agent) plus verack (24 bytes).
const HANDSHAKE_BYTES: u64 = 158;

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_byte_counts() {
    let (outbound, inbound) = connected_pair(test_config(), test_config()).await;

    assert!(
        wait_until(|| {
            outbound.bytes_sent() == HANDSHAKE_BYTES
                && outbound.bytes_received() == HANDSHAKE_BYTES
                && inbound.bytes_sent() == HANDSHAKE_BYTES
                && inbound.bytes_received() == HANDSHAKE_BYTES
        })
        .await
    );

    for peer in [&outbound, &inbound] {
        assert_eq!(peer.protocol_version(), PROTOCOL_VERSION);
        assert_eq!(peer.user_agent(), "/btcwire:0.5.0/peer:1.0/");
        assert_eq!(peer.services(), ServiceFlags::NODE_NETWORK);
        assert!(peer.version_known());
        assert!(peer.verack_received());
        assert!(peer.is_connected());
        assert!(peer.conn_time().is_some());
        assert!(peer.last_send().is_some());
        assert!(peer.last_recv().is_some());
    }
    assert!(!outbound.inbound());
    assert!(inbound.inbound());
    assert_eq!(inbound.addr(), Some("10.0.0.1:8333".parse().unwrap()));
}

#[tokio::test]
async fn test_listener_sees_handshake() {
    let (listener, mut events) = RecordingListener::new();
    let inbound_config = test_config().with_listener(listener);
    let (_outbound, _inbound) = connected_pair(test_config(), inbound_config).await;

    let version = next_event(&mut events, |e| match e {
        Event::Version(v) => Some(v),
        _ => None,
    })
    .await
    .expect("version callback");
    assert_eq!(version.user_agent, "/btcwire:0.5.0/peer:1.0/");
    assert_eq!(version.protocol_version, PROTOCOL_VERSION as i32);

    let verack = next_event(&mut events, |e| matches!(e, Event::VerAck).then_some(())).await;
    assert!(verack.is_some());

    let written = next_event(&mut events, |e| match e {
        Event::Write {
            bytes,
            command,
            error: None,
        } if command == "verack" => Some(bytes),
        _ => None,
    })
    .await;
    assert_eq!(written, Some(24));
}

#[tokio::test]
async fn test_read_callback_counts_frame_bytes() {
    let (listener, mut events) = RecordingListener::new();
    let inbound_config = test_config().with_listener(listener);
    let (_outbound, _inbound) = connected_pair(test_config(), inbound_config).await;

    let read = next_event(&mut events, |e| match e {
        Event::Read {
            bytes,
            command: Some(command),
            error: None,
        } if command == "version" => Some(bytes),
        _ => None,
    })
    .await;
    assert_eq!(read, Some(134));
}

#[tokio::test]
async fn test_starting_height_reaches_remote() {
    let outbound_config = test_config().with_newest_block(|| Ok((Hash256::ZERO, 234_439)));
    let (_outbound, inbound) = connected_pair(outbound_config, test_config()).await;

    assert_eq!(inbound.starting_height(), 234_439);
    assert_eq!(inbound.last_block(), 234_439);

    inbound.update_last_block_height(234_440);
    inbound.update_last_block_height(1);
    assert_eq!(inbound.last_block(), 234_440);
    assert_eq!(inbound.starting_height(), 234_439);
}

#[tokio::test]
async fn test_newest_block_failure_aborts_connect() {
    let config = test_config().with_newest_block(|| Err("chain not loaded".into()));
    let (conn, _remote) = pipe();
    let peer = Peer::new_outbound(config, "10.0.0.2:8333").unwrap();

    let err = peer.connect(conn).unwrap_err();
    assert!(matches!(err, PeerError::NewestBlock(_)));
    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
    assert!(!peer.is_connected());
}

#[tokio::test]
async fn test_connect_twice_is_ignored() {
    let (outbound, _inbound) = connected_pair(test_config(), test_config()).await;

    assert!(outbound.connect(HungConn).is_ok());
    assert_eq!(outbound.handshake_state(), HandshakeState::Established);
    assert!(outbound.is_connected());
}

#[tokio::test]
async fn test_self_connection_rejected() {
    let registry = Arc::new(NonceRegistry::new(NONCE_REGISTRY_CAPACITY));
    let mut outbound_config = test_config();
    outbound_config.allow_self_connections = false;
    outbound_config.nonce_registry = registry.clone();
    let mut inbound_config = outbound_config.clone();
    inbound_config.nonce_registry = registry;

    let (out_conn, in_conn) = pipe();
    let outbound = Peer::new_outbound(outbound_config, "10.0.0.2:8333").unwrap();
    let inbound = Peer::new_inbound(inbound_config);
    inbound.connect(in_conn).unwrap();
    outbound.connect(out_conn).unwrap();

    assert!(tokio::time::timeout(WAIT, inbound.wait_for_disconnect())
        .await
        .is_ok());
    assert!(!inbound.version_known());
    assert!(tokio::time::timeout(WAIT, outbound.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_handshake_timeout() {
    let mut config = test_config();
    config.handshake_timeout = Duration::from_millis(100);
    let (conn, _silent_remote) = pipe();
    let peer = Peer::new_inbound(config);
    peer.connect(conn).unwrap();

    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
    assert_ne!(peer.handshake_state(), HandshakeState::Established);
}

#[tokio::test]
async fn test_zero_timers_refuse_to_start() {
    let cases: [(&str, fn(&mut PeerConfig)); 3] = [
        ("ping_interval", |c| c.ping_interval = Duration::ZERO),
        ("stall_tick", |c| c.stall_tick = Duration::ZERO),
        ("trickle_interval", |c| c.trickle_interval = Duration::ZERO),
    ];
    for (name, zero) in cases {
        let mut config = test_config();
        config.handshake_timeout = Duration::from_millis(100);
        zero(&mut config);
        let (conn, _silent_remote) = pipe();
        let peer = Peer::new_inbound(config);

        let err = peer.connect(conn).unwrap_err();
        assert!(matches!(err, PeerError::InvalidConfig(ref msg) if msg.contains(name)), "{}", err);
        assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
            .await
            .is_ok());
        assert!(!peer.is_connected());
        assert_eq!(peer.conn_time(), None);
    }
}

#[tokio::test]
async fn test_time_offset_recorded() {
    let (peer, _frames, mut writer) = raw_inbound(test_config());

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64;
    let mut version = test_version(13, 0);
    version.timestamp = now + 3600;
    writer
        .write_all(&encode_frame(&Message::Version(version), PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap())
        .await
        .unwrap();

    assert!(wait_until(|| peer.version_known()).await);
    let offset = peer.time_offset();
    assert!((3595..=3605).contains(&offset), "offset {}", offset);
    assert_eq!(peer.stats_snapshot().time_offset, offset);
}

// ============================================================================
// Keepalive and liveness
// ============================================================================

#[tokio::test]
async fn test_keepalive_pings_are_answered() {
    let (in_listener, mut in_events) = RecordingListener::new();
    let (out_listener, mut out_events) = RecordingListener::new();
    let mut outbound_config = test_config().with_listener(out_listener);
    outbound_config.ping_interval = Duration::from_millis(100);
    outbound_config.ping_timeout = Duration::from_millis(300);
    let inbound_config = test_config().with_listener(in_listener);
    let (outbound, inbound) = connected_pair(outbound_config, inbound_config).await;

    let ping = next_event(&mut in_events, |e| match e {
        Event::Ping(p) => Some(p),
        _ => None,
    })
    .await
    .expect("keepalive ping");
    let pong = next_event(&mut out_events, |e| match e {
        Event::Pong(p) => Some(p),
        _ => None,
    })
    .await
    .expect("pong");
    assert_eq!(pong.nonce, ping.nonce);
    assert!(outbound.last_ping_time().is_some());

    // Answered pings never trip the ping timeout.
    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(outbound.is_connected());
    assert!(inbound.is_connected());
}

#[tokio::test]
async fn test_unanswered_ping_times_out() {
    let mut config = test_config();
    config.ping_interval = Duration::from_millis(100);
    config.ping_timeout = Duration::from_millis(200);
    let (peer, mut frames, _writer) = raw_handshake_with(config).await;

    let nonce = tokio::time::timeout(WAIT, async {
        while let Some(Ok(frame)) = frames.next().await {
            if let Message::Ping(ping) = frame.message {
                return Some(ping.nonce);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
    .expect("keepalive ping");

    // Stall timeout is minutes away, so only the missing pong can end this.
    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
    assert_eq!(peer.handshake_state(), HandshakeState::Established);
    assert_eq!(peer.last_ping_nonce(), nonce);
}

#[tokio::test]
async fn test_silent_established_peer_stalls() {
    let mut inbound_config = test_config();
    inbound_config.stall_timeout = Duration::from_millis(300);
    let (outbound, inbound) = connected_pair(test_config(), inbound_config).await;
    assert!(inbound.last_recv().is_some());

    // Neither side pings, so the inbound hears nothing after the handshake.
    assert!(tokio::time::timeout(WAIT, inbound.wait_for_disconnect())
        .await
        .is_ok());
    assert_eq!(inbound.handshake_state(), HandshakeState::Established);

    // Closing the transport ends the remote session too.
    assert!(tokio::time::timeout(WAIT, outbound.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_ping_records_nonce_and_latency() {
    let (listener, mut events) = RecordingListener::new();
    let outbound_config = test_config().with_listener(listener);
    let (outbound, _inbound) = connected_pair(outbound_config, test_config()).await;

    outbound.queue_message(Message::Ping(MsgPing::new(42)), None);

    let pong = next_event(&mut events, |e| match e {
        Event::Pong(p) => Some(p),
        _ => None,
    })
    .await
    .expect("pong");
    assert_eq!(pong.nonce, 42);
    assert!(wait_until(|| outbound.last_ping_nonce() == 42).await);
    assert!(outbound.last_ping_time().is_some());
    assert!(outbound.last_ping_micros() >= 0);
}

#[tokio::test]
async fn test_write_stall_disconnects() {
    let (listener, mut events) = RecordingListener::new();
    let mut config = test_config().with_listener(listener);
    config.write_timeout = Duration::from_millis(100);
    let peer = Peer::new_outbound(config, "10.0.0.9:8333").unwrap();
    peer.connect(HungConn).unwrap();

    let error = next_event(&mut events, |e| match e {
        Event::Write {
            command,
            error: Some(error),
            ..
        } if command == "version" => Some(error),
        _ => None,
    })
    .await
    .expect("write error");
    assert!(error.contains("Write stalled"), "{}", error);
    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_stuck_shutdown_still_releases_transport() {
    let mut config = test_config();
    config.write_timeout = Duration::from_millis(100);
    let peer = Peer::new_outbound(config, "10.0.0.10:8333").unwrap();
    let (conn, dropped) = StuckShutdownConn::new();
    peer.connect(conn).unwrap();
    assert!(wait_until(|| peer.bytes_sent() > 0).await);

    peer.disconnect();
    assert!(wait_until(|| dropped.load(Ordering::SeqCst)).await);
}

#[tokio::test]
async fn test_disconnect_releases_waiters() {
    let peer = Peer::new_outbound(test_config(), "10.0.0.9:8333").unwrap();
    peer.connect(HungConn).unwrap();

    let (done_tx, done_rx) = oneshot::channel();
    peer.queue_message(Message::GetAddr, Some(done_tx));

    let waiter = {
        let peer = peer.clone();
        tokio::spawn(async move { peer.wait_for_disconnect().await })
    };

    peer.disconnect();
    peer.disconnect();

    assert!(tokio::time::timeout(WAIT, done_rx).await.is_ok());
    assert!(tokio::time::timeout(WAIT, waiter).await.is_ok());
    assert!(!peer.is_connected());

    // Messages queued after shutdown complete at once.
    let (late_tx, late_rx) = oneshot::channel();
    peer.queue_message(Message::GetAddr, Some(late_tx));
    assert!(late_rx.await.is_ok());
}

// ============================================================================
// Queued traffic
// ============================================================================

#[tokio::test]
async fn test_known_inventory_not_announced() {
    let (listener, mut events) = RecordingListener::new();
    let inbound_config = test_config().with_listener(listener);
    let (outbound, _inbound) = connected_pair(test_config(), inbound_config).await;
    assert!(wait_until(|| outbound.bytes_sent() == HANDSHAKE_BYTES).await);

    let known = InvVect::new(InvType::Block, test_hash(1));
    outbound.add_known_inventory(known);
    outbound.queue_inventory(known);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(outbound.bytes_sent(), HANDSHAKE_BYTES);

    let fresh = InvVect::new(InvType::Tx, test_hash(2));
    outbound.queue_inventory(fresh);
    // Header (24) + count (1) + one vector (36).
    assert!(wait_until(|| outbound.bytes_sent() == HANDSHAKE_BYTES + 61).await);

    let inv = next_event(&mut events, |e| match e {
        Event::Inv(inv) => Some(inv),
        _ => None,
    })
    .await
    .expect("inv");
    assert_eq!(inv.inv_list, vec![fresh]);

    // Announced once, never again.
    outbound.queue_inventory(fresh);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(outbound.bytes_sent(), HANDSHAKE_BYTES + 61);
}

#[tokio::test]
async fn test_push_addr_skips_known_addresses() {
    let (listener, mut events) = RecordingListener::new();
    let inbound_config = test_config().with_listener(listener);
    let (outbound, inbound) = connected_pair(test_config(), inbound_config).await;

    let addresses = vec![test_address(5), test_address(6)];
    let sent = outbound.push_addr_message(&addresses).unwrap();
    assert_eq!(sent.len(), 2);
    assert!(outbound.push_addr_message(&addresses).unwrap().is_empty());

    let addr = next_event(&mut events, |e| match e {
        Event::Addr(addr) => Some(addr),
        _ => None,
    })
    .await
    .expect("addr");
    assert_eq!(addr.addr_list.len(), 2);

    // Addresses received from the remote are known to it.
    assert!(inbound.push_addr_message(&addresses[..1]).unwrap().is_empty());
    assert_eq!(inbound.push_addr_message(&[test_address(7)]).unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_blocks_filters_repeats() {
    let (listener, mut events) = RecordingListener::new();
    let inbound_config = test_config().with_listener(listener);
    let (outbound, _inbound) = connected_pair(test_config(), inbound_config).await;

    let first = test_locator(1, 3);
    let second = test_locator(2, 3);
    let stop = Hash256::ZERO;
    outbound.push_get_blocks_message(first.clone(), stop).unwrap();
    outbound.push_get_blocks_message(first.clone(), stop).unwrap();
    outbound.push_get_blocks_message(second.clone(), stop).unwrap();

    let pick = |e| match e {
        Event::GetBlocks(m) => Some(m),
        _ => None,
    };
    let received = next_event(&mut events, pick).await.expect("first getblocks");
    assert_eq!(received.block_locator_hashes, first);
    let received = next_event(&mut events, pick).await.expect("second getblocks");
    assert_eq!(received.block_locator_hashes, second);

    let err = outbound
        .push_get_blocks_message(test_locator(3, 501), stop)
        .unwrap_err();
    assert!(matches!(err, PeerError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_stats_snapshot_serializes() {
    let (outbound, _inbound) = connected_pair(test_config(), test_config()).await;
    assert!(wait_until(|| outbound.bytes_received() == HANDSHAKE_BYTES).await);

    let snapshot = outbound.stats_snapshot();
    assert_eq!(snapshot.addr, "10.0.0.2:8333");
    assert!(!snapshot.inbound);
    assert!(snapshot.version_known);

    let json: serde_json::Value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["protocol_version"], PROTOCOL_VERSION);
    assert_eq!(json["user_agent"], "/btcwire:0.5.0/peer:1.0/");
    assert_eq!(json["bytes_received"], HANDSHAKE_BYTES);
}

// ============================================================================
// Misbehaving remotes
// ============================================================================

type RawFrames = FramedRead<tokio::io::ReadHalf<MockConn>, MessageCodec>;
type RawWriter = tokio::io::WriteHalf<MockConn>;

/// Inbound peer plus the raw remote end of its transport.
fn raw_inbound(config: PeerConfig) -> (Peer, RawFrames, RawWriter) {
    let (remote, local) = pipe();
    let peer = Peer::new_inbound(config);
    peer.connect(local).unwrap();

    let (reader, writer) = tokio::io::split(remote);
    let frames = FramedRead::new(reader, MessageCodec::new(Network::Mainnet, PROTOCOL_VERSION));
    (peer, frames, writer)
}

async fn next_reject(frames: &mut RawFrames) -> Option<colx_wire::MsgReject> {
    tokio::time::timeout(WAIT, async {
        while let Some(Ok(frame)) = frames.next().await {
            if let Message::Reject(reject) = frame.message {
                return Some(reject);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

/// Drive an inbound peer from the raw remote end of a pipe through the
/// handshake.
async fn raw_handshake() -> (Peer, RawFrames, RawWriter) {
    raw_handshake_with(test_config()).await
}

async fn raw_handshake_with(config: PeerConfig) -> (Peer, RawFrames, RawWriter) {
    let (peer, mut frames, mut writer) = raw_inbound(config);
    let magic = Network::Mainnet.magic();

    let version = Message::Version(test_version(7, 100));
    writer
        .write_all(&encode_frame(&version, PROTOCOL_VERSION, magic).unwrap())
        .await
        .unwrap();

    let first = frames.next().await.unwrap().unwrap();
    assert_eq!(first.message.command(), "version");
    let second = frames.next().await.unwrap().unwrap();
    assert_eq!(second.message, Message::VerAck);

    writer
        .write_all(&encode_frame(&Message::VerAck, PROTOCOL_VERSION, magic).unwrap())
        .await
        .unwrap();
    assert!(wait_until(|| peer.handshake_state() == HandshakeState::Established).await);
    (peer, frames, writer)
}

#[tokio::test]
async fn test_malformed_payload_is_rejected() {
    let (peer, mut frames, mut writer) = raw_handshake().await;

    // A ping whose nonce is truncated to 3 bytes.
    let payload = [0x01u8, 0x02, 0x03];
    let mut frame = BytesMut::new();
    frame.put_u32_le(Network::Mainnet.magic());
    frame.put_slice(b"ping\0\0\0\0\0\0\0\0");
    frame.put_u32_le(payload.len() as u32);
    frame.put_slice(&checksum(&payload));
    frame.put_slice(&payload);
    writer.write_all(&frame).await.unwrap();

    let reject = next_reject(&mut frames).await.expect("reject");
    assert_eq!(reject.cmd, "ping");
    assert_eq!(reject.code, RejectCode::Malformed);
    assert!(reject.hash.is_none());

    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_obsolete_version_rejected() {
    let mut config = test_config();
    config.min_protocol_version = PROTOCOL_VERSION;
    let (peer, mut frames, mut writer) = raw_inbound(config);

    let mut version = test_version(11, 0);
    version.protocol_version = 70002;
    let frame = encode_frame(&Message::Version(version), 70002, Network::Mainnet.magic()).unwrap();
    writer.write_all(&frame).await.unwrap();

    let reject = next_reject(&mut frames).await.expect("reject");
    assert_eq!(reject.cmd, "version");
    assert_eq!(reject.code, RejectCode::Obsolete);

    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
    assert_eq!(peer.handshake_state(), HandshakeState::Failed);
}

#[tokio::test]
async fn test_duplicate_version_rejected_and_ignored() {
    let (peer, mut frames, mut writer) = raw_handshake().await;

    let again = Message::Version(test_version(8, 100));
    writer
        .write_all(&encode_frame(&again, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap())
        .await
        .unwrap();

    let reject = next_reject(&mut frames).await.expect("reject");
    assert_eq!(reject.cmd, "version");
    assert_eq!(reject.code, RejectCode::Duplicate);
    assert!(peer.is_connected());
    assert_eq!(peer.handshake_state(), HandshakeState::Established);
}

#[tokio::test]
async fn test_duplicate_version_disconnects_when_configured() {
    let mut config = test_config();
    config.disconnect_on_duplicate_handshake = true;
    let (peer, mut frames, mut writer) = raw_handshake_with(config).await;

    let again = Message::Version(test_version(8, 100));
    writer
        .write_all(&encode_frame(&again, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap())
        .await
        .unwrap();

    let reject = next_reject(&mut frames).await.expect("reject");
    assert_eq!(reject.cmd, "version");
    assert_eq!(reject.code, RejectCode::Duplicate);
    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_duplicate_verack_disconnects_when_configured() {
    let mut config = test_config();
    config.disconnect_on_duplicate_handshake = true;
    let (peer, _frames, mut writer) = raw_handshake_with(config).await;

    writer
        .write_all(&encode_frame(&Message::VerAck, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap())
        .await
        .unwrap();

    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_duplicate_verack_ignored_by_default() {
    let (peer, _frames, mut writer) = raw_handshake().await;

    writer
        .write_all(&encode_frame(&Message::VerAck, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(peer.is_connected());
    assert_eq!(peer.handshake_state(), HandshakeState::Established);
}

#[tokio::test]
async fn test_bad_checksum_disconnects() {
    let (peer, _frames, mut writer) = raw_handshake().await;

    let mut frame = BytesMut::from(
        &encode_frame(&Message::GetAddr, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap()[..],
    );
    frame[20] ^= 0xff;
    writer.write_all(&frame).await.unwrap();

    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
}

#[tokio::test]
async fn test_message_before_version_disconnects() {
    let (remote, local) = pipe();
    let peer = Peer::new_inbound(test_config());
    peer.connect(local).unwrap();

    let (_reader, mut writer) = tokio::io::split(remote);
    let frame = encode_frame(&Message::GetAddr, PROTOCOL_VERSION, Network::Mainnet.magic()).unwrap();
    writer.write_all(&frame).await.unwrap();

    assert!(tokio::time::timeout(WAIT, peer.wait_for_disconnect())
        .await
        .is_ok());
    assert_eq!(peer.handshake_state(), HandshakeState::Failed);
}
