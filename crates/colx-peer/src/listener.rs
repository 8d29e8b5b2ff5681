//! Callbacks invoked by a session for inbound traffic.

use crate::{Peer, PeerError};
use colx_wire::{
    Message, MsgAddr, MsgAlert, MsgBlock, MsgFeeFilter, MsgFilterAdd, MsgFilterLoad, MsgGetBlocks,
    MsgGetData, MsgGetHeaders, MsgHeaders, MsgInv, MsgMerkleBlock, MsgNotFound, MsgPing, MsgPong,
    MsgReject, MsgTx, MsgVersion,
};

/// Receives inbound messages from a peer.
///
/// Callbacks run on the session's read pump in arrival order; the next
/// message is not read until a callback returns. Hand slow work off to
/// another task.
#[allow(unused_variables)]
pub trait MessageListener: Send + Sync {
    /// Remote version accepted. Our verack is queued after this returns.
    fn on_version(&self, peer: &Peer, msg: &MsgVersion) {}
    fn on_verack(&self, peer: &Peer) {}
    fn on_get_addr(&self, peer: &Peer) {}
    fn on_addr(&self, peer: &Peer, msg: &MsgAddr) {}
    fn on_ping(&self, peer: &Peer, msg: &MsgPing) {}
    fn on_pong(&self, peer: &Peer, msg: &MsgPong) {}
    fn on_alert(&self, peer: &Peer, msg: &MsgAlert) {}
    fn on_mem_pool(&self, peer: &Peer) {}
    fn on_tx(&self, peer: &Peer, msg: &MsgTx) {}
    fn on_block(&self, peer: &Peer, msg: &MsgBlock) {}
    fn on_merkle_block(&self, peer: &Peer, msg: &MsgMerkleBlock) {}
    fn on_inv(&self, peer: &Peer, msg: &MsgInv) {}
    fn on_headers(&self, peer: &Peer, msg: &MsgHeaders) {}
    fn on_not_found(&self, peer: &Peer, msg: &MsgNotFound) {}
    fn on_get_data(&self, peer: &Peer, msg: &MsgGetData) {}
    fn on_get_blocks(&self, peer: &Peer, msg: &MsgGetBlocks) {}
    fn on_get_headers(&self, peer: &Peer, msg: &MsgGetHeaders) {}
    fn on_filter_add(&self, peer: &Peer, msg: &MsgFilterAdd) {}
    fn on_filter_clear(&self, peer: &Peer) {}
    fn on_filter_load(&self, peer: &Peer, msg: &MsgFilterLoad) {}
    fn on_fee_filter(&self, peer: &Peer, msg: &MsgFeeFilter) {}
    fn on_reject(&self, peer: &Peer, msg: &MsgReject) {}
    fn on_send_headers(&self, peer: &Peer) {}

    /// After every inbound frame, or with the error that ended reading.
    fn on_read(&self, peer: &Peer, bytes: usize, msg: Option<&Message>, err: Option<&PeerError>) {}

    /// After every outbound write attempt.
    fn on_write(&self, peer: &Peer, bytes: usize, msg: &Message, err: Option<&PeerError>) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl MessageListener for NoopListener {}

/// Route `msg` to its callback. Unknown commands have none.
pub(crate) fn dispatch(listener: &dyn MessageListener, peer: &Peer, msg: &Message) {
    match msg {
        Message::Version(m) => listener.on_version(peer, m),
        Message::VerAck => listener.on_verack(peer),
        Message::GetAddr => listener.on_get_addr(peer),
        Message::Addr(m) => listener.on_addr(peer, m),
        Message::Ping(m) => listener.on_ping(peer, m),
        Message::Pong(m) => listener.on_pong(peer, m),
        Message::Alert(m) => listener.on_alert(peer, m),
        Message::MemPool => listener.on_mem_pool(peer),
        Message::Tx(m) => listener.on_tx(peer, m),
        Message::Block(m) => listener.on_block(peer, m),
        Message::MerkleBlock(m) => listener.on_merkle_block(peer, m),
        Message::Inv(m) => listener.on_inv(peer, m),
        Message::Headers(m) => listener.on_headers(peer, m),
        Message::NotFound(m) => listener.on_not_found(peer, m),
        Message::GetData(m) => listener.on_get_data(peer, m),
        Message::GetBlocks(m) => listener.on_get_blocks(peer, m),
        Message::GetHeaders(m) => listener.on_get_headers(peer, m),
        Message::FilterAdd(m) => listener.on_filter_add(peer, m),
        Message::FilterClear => listener.on_filter_clear(peer),
        Message::FilterLoad(m) => listener.on_filter_load(peer, m),
        Message::FeeFilter(m) => listener.on_fee_filter(peer, m),
        Message::Reject(m) => listener.on_reject(peer, m),
        Message::SendHeaders => listener.on_send_headers(peer),
        Message::Unknown { .. } => {}
    }
}
