//! Cryptography module - SHA3-256 content hashing

mod hash;

pub use hash::*;
