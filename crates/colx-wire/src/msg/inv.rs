//! Inventory lists: `inv`, `getdata` and `notfound`.

use crate::encode::{read_count, write_var_int};
use crate::message::WireMessage;
use crate::{InvVect, WireError, WireResult, INV_VECT_SIZE, MAX_INV_PER_MSG, MAX_VAR_INT_PAYLOAD};
use bytes::{Bytes, BytesMut};

fn check_len(len: usize) -> WireResult<()> {
    if len > MAX_INV_PER_MSG {
        return Err(WireError::InvalidMessage(format!(
            "Too many inventory vectors: {} > {}",
            len, MAX_INV_PER_MSG
        )));
    }
    Ok(())
}

fn encode_list(dst: &mut BytesMut, list: &[InvVect]) -> WireResult<()> {
    check_len(list.len())?;
    write_var_int(dst, list.len() as u64);
    for iv in list {
        iv.encode(dst);
    }
    Ok(())
}

fn decode_list(buf: &mut Bytes) -> WireResult<Vec<InvVect>> {
    let count = read_count(buf, MAX_INV_PER_MSG, "inventory vectors")?;
    let mut list = Vec::with_capacity(count);
    for _ in 0..count {
        list.push(InvVect::decode(buf)?);
    }
    Ok(list)
}

macro_rules! inv_message {
    ($(#[$doc:meta])* $name:ident, $command:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        pub struct $name {
            pub inv_list: Vec<InvVect>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            /// Append an inventory vector, failing once the message is full.
            pub fn add_inv_vect(&mut self, iv: InvVect) -> WireResult<()> {
                check_len(self.inv_list.len() + 1)?;
                self.inv_list.push(iv);
                Ok(())
            }
        }

        impl WireMessage for $name {
            const COMMAND: &'static str = $command;

            fn encode(&self, dst: &mut BytesMut, _pver: u32) -> WireResult<()> {
                encode_list(dst, &self.inv_list)
            }

            fn decode(buf: &mut Bytes, _pver: u32) -> WireResult<Self> {
                Ok(Self {
                    inv_list: decode_list(buf)?,
                })
            }

            fn max_payload_length(_pver: u32) -> usize {
                MAX_VAR_INT_PAYLOAD + MAX_INV_PER_MSG * INV_VECT_SIZE
            }
        }
    };
}

inv_message!(
    /// Announces known objects.
    MsgInv,
    "inv"
);
inv_message!(
    /// Requests the contents of announced objects.
    MsgGetData,
    "getdata"
);
inv_message!(
    /// Answers a `getdata` for objects the sender does not have.
    MsgNotFound,
    "notfound"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hash256, InvType, PROTOCOL_VERSION};

    #[test]
    fn test_inv_encoding() {
        let mut inv = MsgInv::new();
        inv.add_inv_vect(InvVect::new(InvType::Block, Hash256::hash(b"b"))).unwrap();
        inv.add_inv_vect(InvVect::new(InvType::Tx, Hash256::hash(b"t"))).unwrap();

        let mut dst = BytesMut::new();
        inv.encode(&mut dst, PROTOCOL_VERSION).unwrap();
        assert_eq!(dst.len(), 1 + 2 * INV_VECT_SIZE);
        assert_eq!(dst[1], 2);
        assert_eq!(MsgInv::decode(&mut dst.freeze(), PROTOCOL_VERSION).unwrap(), inv);
    }

    #[test]
    fn test_inv_limit() {
        let mut msg = MsgGetData::new();
        msg.inv_list = vec![InvVect::new(InvType::Tx, Hash256::ZERO); MAX_INV_PER_MSG];
        assert!(msg.add_inv_vect(InvVect::new(InvType::Tx, Hash256::ZERO)).is_err());

        msg.inv_list.push(InvVect::new(InvType::Tx, Hash256::ZERO));
        let mut dst = BytesMut::new();
        assert!(msg.encode(&mut dst, PROTOCOL_VERSION).is_err());
    }

    #[test]
    fn test_decode_count_over_limit() {
        // var-int 50001
        let mut buf = Bytes::from_static(&[0xfd, 0x51, 0xc3]);
        assert!(MsgNotFound::decode(&mut buf, PROTOCOL_VERSION).is_err());
    }
}
