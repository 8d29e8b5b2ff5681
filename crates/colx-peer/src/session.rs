//! The three tasks driving a connected peer.
//!
//! - read pump: decodes frames, runs the handshake, dispatches to the listener
//! - write pump: owns the outbound queue and the trickle timer
//! - supervisor: keepalive pings and liveness checks
//!
//! All three select on the peer's cancellation token and call
//! [`Peer::disconnect`] when they stop for any other reason.

use crate::handshake::{negotiate_version, validate_remote_version};
use crate::listener::dispatch;
use crate::queue::{Outbound, OutboundQueue, QueuedMessage};
use crate::{HandshakeError, Peer, PeerError, PeerResult};
use colx_wire::{
    encode_frame, Message, MessageCodec, MsgPing, MsgPong, MsgVersion, RejectCode,
    BIP0031_VERSION,
};
use futures::StreamExt;
use std::time::{Instant, SystemTime};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

pub(crate) async fn read_pump<R>(peer: Peer, reader: R)
where
    R: AsyncRead + Unpin,
{
    let config = &peer.inner.config;
    let codec = MessageCodec::new(config.network, config.protocol_version);
    let mut framed = FramedRead::new(reader, codec);

    loop {
        let next = tokio::select! {
            _ = peer.inner.quit.cancelled() => break,
            next = framed.next() => next,
        };

        let frame = match next {
            Some(Ok(frame)) => frame,
            Some(Err(err)) => {
                let command = framed.decoder().last_command().to_string();
                let framing = err.is_framing();
                let err = PeerError::from(err);
                config.listener.on_read(&peer, 0, None, Some(&err));
                if peer.is_connected() {
                    warn!(peer = %peer, error = %err, "Cannot read message");
                    if !framing {
                        peer.push_reject_message(
                            &command,
                            RejectCode::Malformed,
                            &err.to_string(),
                            None,
                            true,
                        )
                        .await;
                    }
                }
                break;
            }
            None => {
                debug!(peer = %peer, "Connection closed by remote");
                break;
            }
        };

        {
            let mut stats = peer.inner.stats.lock();
            stats.bytes_received += frame.wire_len as u64;
            stats.last_recv = Some(SystemTime::now());
            stats.last_recv_at = Some(Instant::now());
        }
        debug!(peer = %peer, command = frame.message.command(), bytes = frame.wire_len, "Received message");
        config
            .listener
            .on_read(&peer, frame.wire_len, Some(&frame.message), None);

        if let Err(err) = handle_message(&peer, frame.message, framed.decoder_mut()).await {
            warn!(peer = %peer, error = %err, "Dropping peer");
            break;
        }
    }

    peer.disconnect();
}

async fn handle_message(peer: &Peer, msg: Message, codec: &mut MessageCodec) -> PeerResult<()> {
    let listener = peer.inner.config.listener.clone();

    let checked = peer.inner.negotiated.read().handshake.check_message(msg.command());
    if let Err(err) = checked {
        peer.inner.negotiated.write().handshake.fail();
        return Err(err.into());
    }

    match &msg {
        Message::Version(version) => return handle_version(peer, version, codec).await,
        Message::VerAck => {
            let result = peer.inner.negotiated.write().handshake.on_verack_received();
            match result {
                Ok(()) => note_handshake_progress(peer),
                Err(HandshakeError::Duplicate(command)) => {
                    return duplicate_handshake_message(peer, command);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Message::Ping(ping) => {
            if peer.protocol_version() > BIP0031_VERSION {
                peer.queue_message(Message::Pong(MsgPong::new(ping.nonce)), None);
            }
        }
        Message::Pong(pong) => handle_pong(peer, pong),
        Message::Inv(inv) => {
            let mut known = peer.inner.known_inventory.lock();
            for iv in &inv.inv_list {
                known.insert(*iv);
            }
        }
        Message::Addr(addr) => peer.add_known_addresses(&addr.addr_list),
        Message::SendHeaders => peer.inner.negotiated.write().wants_headers = true,
        Message::Unknown { command, payload } => {
            debug!(peer = %peer, command = %command, bytes = payload.len(), "Ignoring unknown message");
        }
        _ => {}
    }

    dispatch(listener.as_ref(), peer, &msg);
    Ok(())
}

async fn handle_version(peer: &Peer, version: &MsgVersion, codec: &mut MessageCodec) -> PeerResult<()> {
    let config = &peer.inner.config;

    if peer.version_known() {
        peer.push_reject_message(
            "version",
            RejectCode::Duplicate,
            "duplicate version message",
            None,
            false,
        )
        .await;
        return duplicate_handshake_message(peer, "version".to_string());
    }

    if let Err(err) = validate_remote_version(version, config) {
        if let HandshakeError::ProtocolTooOld { .. } = err {
            peer.push_reject_message("version", RejectCode::Obsolete, &err.to_string(), None, true)
                .await;
        }
        peer.inner.negotiated.write().handshake.fail();
        return Err(err.into());
    }

    let pver = negotiate_version(config.protocol_version, version.protocol_version);
    {
        let mut negotiated = peer.inner.negotiated.write();
        negotiated.handshake.on_version_received()?;
        negotiated.protocol_version = pver;
        negotiated.services = version.services;
        negotiated.user_agent = version.user_agent.clone();
        negotiated.disable_relay_tx = version.disable_relay_tx;
    }
    {
        let mut stats = peer.inner.stats.lock();
        stats.starting_height = version.last_block;
        stats.last_block = version.last_block;
    }
    peer.record_time_offset(version.timestamp);
    codec.set_protocol_version(pver);

    info!(
        peer = %peer,
        protocol = pver,
        agent = %version.user_agent,
        services = %version.services,
        height = version.last_block,
        "Received version"
    );
    config.listener.on_version(peer, version);

    if peer.inbound() {
        let local = peer.local_version_msg()?;
        peer.queue_message(Message::Version(local), None);
    }
    peer.queue_message(Message::VerAck, None);
    Ok(())
}

fn duplicate_handshake_message(peer: &Peer, command: String) -> PeerResult<()> {
    warn!(peer = %peer, command = %command, "Duplicate handshake message");
    if peer.inner.config.disconnect_on_duplicate_handshake {
        return Err(HandshakeError::Duplicate(command).into());
    }
    Ok(())
}

fn handle_pong(peer: &Peer, pong: &MsgPong) {
    let mut stats = peer.inner.stats.lock();
    if let Some(sent) = stats.awaiting_pong {
        if pong.nonce == stats.last_ping_nonce {
            stats.last_ping_micros = sent.elapsed().as_micros() as i64;
            stats.awaiting_pong = None;
        }
    }
}

fn note_handshake_progress(peer: &Peer) {
    if peer.inner.negotiated.read().handshake.is_established() {
        info!(peer = %peer, protocol = peer.protocol_version(), "Handshake complete");
    }
}

/// Account for a completed write.
fn record_sent(peer: &Peer, msg: &Message, bytes: usize) {
    let pver = {
        let mut negotiated = peer.inner.negotiated.write();
        match msg {
            Message::Version(_) => negotiated.handshake.on_version_sent(),
            Message::VerAck => negotiated.handshake.on_verack_sent(),
            _ => {}
        }
        negotiated.protocol_version
    };

    let mut stats = peer.inner.stats.lock();
    stats.bytes_sent += bytes as u64;
    stats.last_send = Some(SystemTime::now());
    if let Message::Ping(ping) = msg {
        if pver > BIP0031_VERSION {
            stats.last_ping_nonce = ping.nonce;
            stats.last_ping_time = Some(SystemTime::now());
            stats.awaiting_pong = Some(Instant::now());
        }
    }
    drop(stats);

    if matches!(msg, Message::VerAck) {
        note_handshake_progress(peer);
    }
}

pub(crate) async fn write_pump<W>(
    peer: Peer,
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    initial: Option<MsgVersion>,
) where
    W: AsyncWrite + Unpin,
{
    let config = &peer.inner.config;
    let magic = config.network.magic();
    let trickle_interval = peer.inner.trickle_interval;
    let mut queue = OutboundQueue::new();
    if let Some(version) = initial {
        queue.push(Outbound::Message(QueuedMessage::new(
            Message::Version(version),
            None,
        )));
    }
    let mut next_trickle = tokio::time::Instant::now() + trickle_interval;

    loop {
        while let Ok(item) = rx.try_recv() {
            queue.push(item);
        }

        if tokio::time::Instant::now() >= next_trickle {
            let flushed = queue.flush_trickle(&mut peer.inner.known_inventory.lock());
            if flushed > 0 {
                debug!(peer = %peer, count = flushed, "Trickling inventory");
            }
            next_trickle = tokio::time::Instant::now() + trickle_interval;
        }

        let queued = match queue.pop() {
            Some(queued) => queued,
            None => {
                tokio::select! {
                    _ = peer.inner.quit.cancelled() => break,
                    item = rx.recv() => match item {
                        Some(item) => queue.push(item),
                        None => break,
                    },
                    _ = tokio::time::sleep_until(next_trickle) => {}
                }
                continue;
            }
        };

        let pver = peer.protocol_version();
        let frame = match encode_frame(&queued.message, pver, magic) {
            Ok(frame) => frame,
            Err(e) => {
                let err = PeerError::from(e);
                warn!(peer = %peer, command = queued.message.command(), error = %err, "Cannot encode message");
                config.listener.on_write(&peer, 0, &queued.message, Some(&err));
                queued.complete();
                continue;
            }
        };

        let write = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        };
        let result = tokio::select! {
            _ = peer.inner.quit.cancelled() => {
                queued.complete();
                break;
            }
            result = tokio::time::timeout(config.write_timeout, write) => result,
        };

        match result {
            Ok(Ok(())) => {
                debug!(peer = %peer, command = queued.message.command(), bytes = frame.len(), "Sent message");
                record_sent(&peer, &queued.message, frame.len());
                config.listener.on_write(&peer, frame.len(), &queued.message, None);
                queued.complete();
            }
            Ok(Err(e)) => {
                let err = PeerError::Io(e);
                warn!(peer = %peer, error = %err, "Write failed");
                config.listener.on_write(&peer, 0, &queued.message, Some(&err));
                queued.complete();
                break;
            }
            Err(_) => {
                let err = PeerError::WriteStalled(config.write_timeout);
                warn!(peer = %peer, error = %err, "Write stalled");
                config.listener.on_write(&peer, 0, &queued.message, Some(&err));
                queued.complete();
                break;
            }
        }
    }

    peer.disconnect();

    rx.close();
    while let Ok(item) = rx.try_recv() {
        item.complete();
    }
    for queued in queue.drain() {
        queued.complete();
    }
    if tokio::time::timeout(config.write_timeout, writer.shutdown()).await.is_err() {
        debug!(peer = %peer, "Transport shutdown timed out");
    }
}

pub(crate) async fn supervisor(peer: Peer) {
    let config = &peer.inner.config;
    let started = Instant::now();
    let now = tokio::time::Instant::now();
    let mut ping_timer = tokio::time::interval_at(now + config.ping_interval, config.ping_interval);
    let mut stall_timer = tokio::time::interval_at(now + config.stall_tick, config.stall_tick);

    loop {
        tokio::select! {
            _ = peer.inner.quit.cancelled() => break,
            _ = ping_timer.tick() => {
                // An outstanding ping keeps its deadline.
                let owed = peer.inner.stats.lock().awaiting_pong.is_some();
                if !owed && peer.handshake_state() == crate::HandshakeState::Established {
                    peer.queue_message(Message::Ping(MsgPing::new(rand::random())), None);
                }
            }
            _ = stall_timer.tick() => {
                if let Some(err) = check_liveness(&peer, started) {
                    warn!(peer = %peer, error = %err, "Peer is not responsive");
                    break;
                }
            }
        }
    }

    peer.disconnect();
}

fn check_liveness(peer: &Peer, started: Instant) -> Option<PeerError> {
    let config = &peer.inner.config;

    if !peer.inner.negotiated.read().handshake.is_established()
        && started.elapsed() > config.handshake_timeout
    {
        return Some(HandshakeError::Timeout(config.handshake_timeout).into());
    }

    let stats = peer.inner.stats.lock();
    let last_activity = stats.last_recv_at.unwrap_or(started);
    if last_activity.elapsed() > config.stall_timeout {
        return Some(PeerError::Stalled(config.stall_timeout));
    }
    if let Some(sent) = stats.awaiting_pong {
        if sent.elapsed() > config.ping_timeout {
            return Some(PeerError::PingTimeout(config.ping_timeout));
        }
    }
    None
}
