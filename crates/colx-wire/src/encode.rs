//! Primitive field encodings shared by every message.
//!
//! Integers are little-endian unless noted. Variable-length integers use the
//! compact 1/3/5/9-byte form and must be minimally encoded.

use crate::{Hash256, WireError, WireResult};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Maximum size of an encoded var-int.
pub const MAX_VAR_INT_PAYLOAD: usize = 9;

/// Number of bytes `value` occupies as a var-int.
pub fn var_int_size(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Fail unless `buf` holds at least `needed` more bytes.
pub(crate) fn ensure(buf: &Bytes, needed: usize, what: &str) -> WireResult<()> {
    if buf.remaining() < needed {
        return Err(WireError::InvalidMessage(format!(
            "Truncated {}: need {} bytes, have {}",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

pub(crate) fn read_u8(buf: &mut Bytes, what: &str) -> WireResult<u8> {
    ensure(buf, 1, what)?;
    Ok(buf.get_u8())
}

pub(crate) fn read_u16_be(buf: &mut Bytes, what: &str) -> WireResult<u16> {
    ensure(buf, 2, what)?;
    Ok(buf.get_u16())
}

pub(crate) fn read_u32(buf: &mut Bytes, what: &str) -> WireResult<u32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_u32_le())
}

pub(crate) fn read_i32(buf: &mut Bytes, what: &str) -> WireResult<i32> {
    ensure(buf, 4, what)?;
    Ok(buf.get_i32_le())
}

pub(crate) fn read_u64(buf: &mut Bytes, what: &str) -> WireResult<u64> {
    ensure(buf, 8, what)?;
    Ok(buf.get_u64_le())
}

pub(crate) fn read_i64(buf: &mut Bytes, what: &str) -> WireResult<i64> {
    ensure(buf, 8, what)?;
    Ok(buf.get_i64_le())
}

pub(crate) fn read_hash(buf: &mut Bytes, what: &str) -> WireResult<Hash256> {
    ensure(buf, 32, what)?;
    let mut bytes = [0u8; 32];
    buf.copy_to_slice(&mut bytes);
    Ok(Hash256(bytes))
}

pub(crate) fn write_hash(dst: &mut BytesMut, hash: &Hash256) {
    dst.put_slice(hash.as_bytes());
}

/// Read a minimally encoded var-int.
pub(crate) fn read_var_int(buf: &mut Bytes, what: &str) -> WireResult<u64> {
    let discriminant = read_u8(buf, what)?;
    let (value, min) = match discriminant {
        0xff => (read_u64(buf, what)?, 0x1_0000_0000u64),
        0xfe => (read_u32(buf, what)? as u64, 0x1_0000),
        0xfd => {
            ensure(buf, 2, what)?;
            (buf.get_u16_le() as u64, 0xfd)
        }
        n => return Ok(n as u64),
    };

    if value < min {
        return Err(WireError::InvalidMessage(format!(
            "Non-canonical var-int for {}: {} encoded with discriminant {:#x}",
            what, value, discriminant
        )));
    }
    Ok(value)
}

pub(crate) fn write_var_int(dst: &mut BytesMut, value: u64) {
    match value {
        0..=0xfc => dst.put_u8(value as u8),
        0xfd..=0xffff => {
            dst.put_u8(0xfd);
            dst.put_u16_le(value as u16);
        }
        0x1_0000..=0xffff_ffff => {
            dst.put_u8(0xfe);
            dst.put_u32_le(value as u32);
        }
        _ => {
            dst.put_u8(0xff);
            dst.put_u64_le(value);
        }
    }
}

/// Read a var-int element count and check it against `max`.
pub(crate) fn read_count(buf: &mut Bytes, max: usize, what: &str) -> WireResult<usize> {
    let count = read_var_int(buf, what)?;
    if count > max as u64 {
        return Err(WireError::InvalidMessage(format!(
            "Too many {}: {} > {}",
            what, count, max
        )));
    }
    Ok(count as usize)
}

/// Read var-int prefixed bytes of at most `max` bytes.
pub(crate) fn read_var_bytes(buf: &mut Bytes, max: usize, what: &str) -> WireResult<Bytes> {
    let len = read_var_int(buf, what)?;
    if len > max as u64 {
        return Err(WireError::InvalidMessage(format!(
            "{} too long: {} > {}",
            what, len, max
        )));
    }
    let len = len as usize;
    ensure(buf, len, what)?;
    Ok(buf.split_to(len))
}

pub(crate) fn write_var_bytes(dst: &mut BytesMut, data: &[u8]) {
    write_var_int(dst, data.len() as u64);
    dst.put_slice(data);
}

/// Read a var-int prefixed string of at most `max` bytes.
pub(crate) fn read_var_string(buf: &mut Bytes, max: usize, what: &str) -> WireResult<String> {
    let bytes = read_var_bytes(buf, max, what)?;
    Ok(String::from_utf8_lossy(&bytes).to_string())
}

pub(crate) fn write_var_string(dst: &mut BytesMut, s: &str) {
    write_var_bytes(dst, s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_int_boundaries() {
        let values = [0u64, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000, u64::MAX];
        let sizes = [1usize, 1, 3, 3, 5, 5, 9, 9];

        for (value, size) in values.iter().zip(sizes.iter()) {
            let mut dst = BytesMut::new();
            write_var_int(&mut dst, *value);
            assert_eq!(dst.len(), *size, "size of {}", value);
            assert_eq!(var_int_size(*value), *size);

            let mut buf = dst.freeze();
            assert_eq!(read_var_int(&mut buf, "value").unwrap(), *value);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_var_int_rejects_non_canonical() {
        // 0x10 encoded with the 3-byte form.
        let mut buf = Bytes::from_static(&[0xfd, 0x10, 0x00]);
        assert!(read_var_int(&mut buf, "value").is_err());

        let mut buf = Bytes::from_static(&[0xfe, 0xff, 0xff, 0x00, 0x00]);
        assert!(read_var_int(&mut buf, "value").is_err());
    }

    #[test]
    fn test_var_bytes_limit() {
        let mut dst = BytesMut::new();
        write_var_bytes(&mut dst, &[1, 2, 3, 4]);
        let mut buf = dst.freeze();
        assert!(read_var_bytes(&mut buf.clone(), 3, "data").is_err());
        assert_eq!(read_var_bytes(&mut buf, 4, "data").unwrap().as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_truncated_fields() {
        let mut buf = Bytes::from_static(&[0x01, 0x02]);
        assert!(read_u32(&mut buf, "field").is_err());
    }
}
