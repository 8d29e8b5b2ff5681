//! 256-bit hashes as used for block, transaction and checksum identifiers.

use crate::{WireError, WireResult};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Size of a hash in bytes.
pub const HASH_SIZE: usize = 32;

/// Maximum length of a hash in its hex string form.
const MAX_HASH_STRING_SIZE: usize = HASH_SIZE * 2;

/// SHA256(SHA256(data)).
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    let mut out = [0u8; 32];
    out.copy_from_slice(&second);
    out
}

/// A 256-bit hash stored in wire (little-endian) byte order.
///
/// Displayed and parsed byte-reversed, matching how block explorers print ids.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256(pub [u8; HASH_SIZE]);

impl Hash256 {
    /// The all-zero hash.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_SIZE]);

    /// Create from wire-order bytes.
    pub fn from_bytes(bytes: [u8; HASH_SIZE]) -> Self {
        Self(bytes)
    }

    /// Double-SHA256 of `data`.
    pub fn hash(data: &[u8]) -> Self {
        Self(double_sha256(data))
    }

    /// Wire-order bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_SIZE] {
        &self.0
    }

    /// Whether every byte is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_SIZE]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        write!(f, "{}", hex::encode(reversed))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl FromStr for Hash256 {
    type Err = WireError;

    /// Parse a byte-reversed hex string. Strings shorter than 64 characters
    /// fill the low-order bytes; an odd length is treated as having a leading zero.
    fn from_str(s: &str) -> WireResult<Self> {
        if s.len() > MAX_HASH_STRING_SIZE {
            return Err(WireError::InvalidMessage(format!(
                "Hash string too long: {} > {}",
                s.len(),
                MAX_HASH_STRING_SIZE
            )));
        }

        let padded = if s.len() % 2 != 0 {
            format!("0{}", s)
        } else {
            s.to_string()
        };
        let decoded = hex::decode(&padded)
            .map_err(|e| WireError::InvalidMessage(format!("Invalid hash string: {}", e)))?;

        let mut bytes = [0u8; HASH_SIZE];
        for (i, b) in decoded.iter().rev().enumerate() {
            bytes[i] = *b;
        }
        Ok(Self(bytes))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_sha256_empty() {
        // Checksum of an empty payload as seen in verack/getaddr frames.
        let hash = double_sha256(&[]);
        assert_eq!(&hash[..4], &[0x5d, 0xf6, 0xe0, 0xe2]);
    }

    #[test]
    fn test_display_is_byte_reversed() {
        let mut bytes = [0u8; 32];
        bytes[0] = 0x01;
        let hash = Hash256(bytes);
        let s = hash.to_string();
        assert!(s.ends_with("01"));
        assert!(s.starts_with("00"));
    }

    #[test]
    fn test_parse_genesis() {
        let hash: Hash256 = "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
            .parse()
            .unwrap();
        assert_eq!(hash.0[0], 0x6f);
        assert_eq!(hash.0[31], 0x00);
        assert_eq!(
            hash.to_string(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_parse_short_odd_string() {
        let hash: Hash256 = "14a0810ac680a3eb3f82edc878cea25ec41d6b790744e5daeef"
            .parse()
            .unwrap();
        assert_eq!(hash.0[0], 0xef);
        assert_eq!(hash.0[25], 0x01);
        assert!(hash.0[26..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_parse_too_long() {
        let s = "0".repeat(65);
        assert!(s.parse::<Hash256>().is_err());
    }
}
