//! # colx-tests
//!
//! Integration tests for the ColossusXT peer stack.
//!
//! This crate provides:
//! - A harness with in-memory transports and a recording listener
//! - End-to-end session tests between two peers
//! - Codec tests against known frames
//! - Property-based round-trip tests

pub mod generators;
pub mod harness;

#[cfg(test)]
mod codec_tests;

#[cfg(test)]
mod peer_tests;


pub use generators::*;
pub use harness::*;
