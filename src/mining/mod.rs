//! Mining module - nonce search for proof-of-work

mod miner;

pub use miner::*;
