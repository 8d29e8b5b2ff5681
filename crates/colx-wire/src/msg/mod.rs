//! Protocol message payloads.
//!
//! Each type implements [`WireMessage`](crate::WireMessage). Payload-less
//! messages (`verack`, `getaddr`, `mempool`, `filterclear`, `sendheaders`) are
//! plain [`Message`](crate::Message) variants.

mod addr;
mod alert;
mod blocks;
mod bloom;
mod inv;
mod ping;
mod reject;
mod tx;
mod version;

pub use addr::{MsgAddr, MAX_ADDR_PER_MSG};
pub use alert::{MsgAlert, MsgFeeFilter};
pub use blocks::{
    BlockHeader, MsgBlock, MsgGetBlocks, MsgGetHeaders, MsgHeaders, MsgMerkleBlock,
    BLOCK_HEADER_SIZE, MAX_BLOCK_HEADERS_PER_MSG, MAX_BLOCK_LOCATORS_PER_MSG,
};
pub use bloom::{
    BloomUpdateType, MsgFilterAdd, MsgFilterLoad, MAX_FILTER_ADD_DATA_SIZE,
    MAX_FILTER_LOAD_FILTER_SIZE, MAX_FILTER_LOAD_HASH_FUNCS,
};
pub use inv::{MsgGetData, MsgInv, MsgNotFound};
pub use ping::{MsgPing, MsgPong};
pub use reject::{MsgReject, RejectCode};
pub use tx::{MsgTx, OutPoint, TxIn, TxOut};
pub use version::{MsgVersion, MAX_USER_AGENT_LEN};

use crate::{WireError, WireResult};

/// Fail when `command` does not exist at protocol version `pver`.
pub(crate) fn require_version(command: &str, pver: u32, min: u32) -> WireResult<()> {
    if pver < min {
        return Err(WireError::UnsupportedVersion {
            command: command.to_string(),
            version: pver,
        });
    }
    Ok(())
}
