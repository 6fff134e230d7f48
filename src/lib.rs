//! BCHT Chain Core Library
//!
//! An append-only ledger of domain reputation votes. Blocks are admitted
//! by proof-of-work and structural limits, stored in a pluggable backend,
//! and tracked through a persisted set of chain tips.

pub mod attitudes;
pub mod chain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod error;
pub mod mining;
pub mod search;
pub mod storage;

pub use error::{ConsensusFailure, Error, Result};

/// Protocol constants - HARD-CODED, NEVER CONFIGURABLE
pub mod constants {
    /// Number of leading zero bytes required in a block hash
    pub const ZERO_BYTES: usize = 2;

    /// Maximum number of entries in one block
    pub const MAX_ENTRIES: usize = 10;

    /// Length of the fixed block header on the wire
    pub const HEADER_LEN: usize = 2 + 32 + 8 + 4; // 46 bytes

    /// Length of the fixed entry header on the wire (attitude + domain length)
    pub const ENTRY_HEADER_LEN: usize = 1 + 4;

    /// Block version produced by this implementation
    pub const BLOCK_VERSION: u16 = 1;

    /// Attribute holding the common parent of all current tips
    pub const ATTR_PREV_HASH: &[u8] = b"prev_hash";

    /// Attribute holding the concatenated hashes of all current tips
    pub const ATTR_CURR_HASHES: &[u8] = b"curr_hashes";
}
