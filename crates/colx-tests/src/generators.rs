//! Test data generators.
//!
//! Deterministic hashes, transactions, headers and version messages for
//! session and codec tests.

use colx_wire::{
    BlockHeader, Hash256, MsgTx, MsgVersion, NetAddress, OutPoint, ServiceFlags, TxIn, TxOut,
};
use std::net::SocketAddr;

/// Hash whose first and last bytes are derived from `seed`.
pub fn test_hash(seed: u8) -> Hash256 {
    let mut bytes = [0u8; 32];
    bytes[0] = seed;
    bytes[31] = seed.wrapping_mul(7);
    Hash256(bytes)
}

/// Block locator of `len` distinct hashes starting at `seed`.
pub fn test_locator(seed: u8, len: usize) -> Vec<Hash256> {
    (0..len)
        .map(|i| {
            let mut hash = test_hash(seed);
            hash.0[1..9].copy_from_slice(&(i as u64).to_le_bytes());
            hash
        })
        .collect()
}

/// One-input, one-output transaction.
pub fn test_tx(seed: u8) -> MsgTx {
    let mut tx = MsgTx::new(1);
    tx.add_tx_in(TxIn::new(
        OutPoint::new(test_hash(seed), seed as u32),
        vec![0x51, seed],
    ));
    tx.add_tx_out(TxOut::new(5_000_000_000, vec![0x76, 0xa9, 0x14, seed]));
    tx
}

/// Header with a fixed timestamp so its hash is stable.
pub fn test_header(seed: u8) -> BlockHeader {
    BlockHeader {
        version: 1,
        prev_block: test_hash(seed),
        merkle_root: test_hash(seed.wrapping_add(1)),
        timestamp: 1_231_006_505,
        bits: 0x1d00_ffff,
        nonce: seed as u32,
    }
}

/// Network address for `10.0.0.<host>:8333`.
pub fn test_address(host: u8) -> NetAddress {
    let addr = SocketAddr::from(([10, 0, 0, host], 8333));
    NetAddress::new(addr, ServiceFlags::NODE_NETWORK)
}

/// Version message as a remote node would send it.
pub fn test_version(nonce: u64, last_block: i32) -> MsgVersion {
    let me = NetAddress {
        services: ServiceFlags::NODE_NETWORK,
        ..NetAddress::default()
    };
    let you = NetAddress {
        timestamp: 0,
        ..test_address(1)
    };
    let mut msg = MsgVersion::new(me, you, nonce, last_block);
    msg.services = ServiceFlags::NODE_NETWORK;
    msg
}
