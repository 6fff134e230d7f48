//! SHA3-256 hashing implementation
//!
//! Blocks are content-addressed by the SHA3-256 digest of their wire bytes.

use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;

use crate::error::{Error, Result};

/// Length of a block hash in bytes
pub const HASH_LEN: usize = 32;

/// 32-byte hash output
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// Create a zero hash (the "no parent" sentinel on the wire)
    pub const fn zero() -> Self {
        Hash([0u8; HASH_LEN])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; HASH_LEN]
    }

    /// Create hash from bytes
    pub fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Hash(bytes)
    }

    /// Create hash from a slice, which must be exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| {
            Error::InvalidHash(format!("{} is not a 32-byte hash", hex::encode(bytes)))
        })?;
        Ok(Hash(arr))
    }

    /// Create hash from hex string, optionally prefixed with `0x`
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        if digits.len() != HASH_LEN * 2 {
            return Err(Error::InvalidHash(format!(
                "{hex} must be a 32-byte hexadecimal string"
            )));
        }
        let bytes = hex::decode(digits).map_err(|e| Error::InvalidHash(format!("{hex}: {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Parse a user-supplied hash. `GEN` names the genesis sentinel.
    pub fn parse_user(value: &str) -> Result<Self> {
        if value.eq_ignore_ascii_case("gen") {
            return Ok(Self::zero());
        }
        Self::from_hex(value)
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Default for Hash {
    fn default() -> Self {
        Self::zero()
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Hash arbitrary bytes using SHA3-256
pub fn hash_bytes(data: &[u8]) -> Hash {
    let digest = Sha3_256::digest(data);
    Hash(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"hello world";
        let hash1 = hash_bytes(data);
        let hash2 = hash_bytes(data);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_known_digest() {
        // SHA3-256("")
        assert_eq!(
            hash_bytes(b"").to_hex(),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn test_zero_hash() {
        let zero = Hash::zero();
        assert_eq!(zero.0, [0u8; 32]);
        assert!(zero.is_zero());
        assert!(!hash_bytes(b"x").is_zero());
    }

    #[test]
    fn test_hex_roundtrip() {
        let hash = hash_bytes(b"test");
        let hex = hash.to_hex();
        assert_eq!(Hash::from_hex(&hex).unwrap(), hash);
        assert_eq!(Hash::from_hex(&format!("0x{hex}")).unwrap(), hash);
    }

    #[test]
    fn test_invalid_lengths_rejected() {
        assert!(matches!(Hash::from_slice(&[1u8; 31]), Err(Error::InvalidHash(_))));
        assert!(matches!(Hash::from_slice(&[1u8; 33]), Err(Error::InvalidHash(_))));
        assert!(matches!(Hash::from_hex("abcd"), Err(Error::InvalidHash(_))));
        assert!(matches!(Hash::from_hex(&"zz".repeat(32)), Err(Error::InvalidHash(_))));
    }

    #[test]
    fn test_parse_user_genesis() {
        assert_eq!(Hash::parse_user("GEN").unwrap(), Hash::zero());
        assert_eq!(Hash::parse_user("gen").unwrap(), Hash::zero());
    }
}
