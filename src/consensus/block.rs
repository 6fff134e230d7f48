//! Block structure for the BCHT chain
//!
//! Defines the immutable vote entry and block records together with their
//! fixed big-endian wire layout:
//!
//! ```text
//! Entry: attitude:u8 | domain_len:u32 | domain_bytes
//! Block: version:u16 | prev_hash:[u8; 32] | creation_time:u64 | nonce:u32 | entries...
//! ```

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::constants::{ENTRY_HEADER_LEN, HEADER_LEN};
use crate::crypto::{hash_bytes, Hash, HASH_LEN};
use crate::error::{Error, Result};

/// Byte offset of the nonce inside the serialized block header
pub const NONCE_OFFSET: usize = 2 + HASH_LEN + 8;

/// One vote about a domain name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entry {
    domain_name: String,
    attitude: u8,
}

impl Entry {
    /// Maximum accepted length of a domain name in bytes
    pub const MAX_DOMAIN_LENGTH: usize = u32::MAX as usize;

    /// Create a new entry.
    ///
    /// Non-ASCII domain names must be IDNA-encoded by the caller.
    pub fn new(domain_name: impl Into<String>, attitude: u8) -> Result<Self> {
        let domain_name = domain_name.into();
        if !domain_name.is_ascii() {
            return Err(Error::InvalidHostName(format!(
                "{domain_name:?} must only contain ASCII characters; \
                 escape non-ASCII names with IDNA encoding first"
            )));
        }
        if domain_name.len() > Self::MAX_DOMAIN_LENGTH {
            return Err(Error::OutOfRange(format!(
                "domain name length must not exceed {}",
                Self::MAX_DOMAIN_LENGTH
            )));
        }
        Ok(Self {
            domain_name,
            attitude,
        })
    }

    pub fn domain_name(&self) -> &str {
        &self.domain_name
    }

    pub fn attitude(&self) -> u8 {
        self.attitude
    }

    /// Length of this entry on the wire
    pub fn encoded_len(&self) -> usize {
        ENTRY_HEADER_LEN + self.domain_name.len()
    }

    /// Append the wire form of this entry to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.attitude);
        // Length is bounded by MAX_DOMAIN_LENGTH at construction.
        out.extend_from_slice(&(self.domain_name.len() as u32).to_be_bytes());
        out.extend_from_slice(self.domain_name.as_bytes());
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut bytes);
        bytes
    }

    /// Decode exactly one entry; trailing bytes are an error.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let (entry, consumed) = Self::decode_prefix(raw)?;
        if consumed != raw.len() {
            return Err(Error::InvalidEntry(
                "length of entry does not match the one in its header".to_string(),
            ));
        }
        Ok(entry)
    }

    /// Decode a concatenated chain of entries until the bytes run out.
    pub fn decode_chain(raw: &[u8]) -> Result<Vec<Self>> {
        let mut entries = Vec::new();
        let mut rest = raw;
        while !rest.is_empty() {
            let (entry, consumed) = Self::decode_prefix(rest)?;
            entries.push(entry);
            rest = &rest[consumed..];
        }
        Ok(entries)
    }

    /// Decode one entry from the front of `raw`, returning it and the
    /// number of bytes it occupied.
    fn decode_prefix(raw: &[u8]) -> Result<(Self, usize)> {
        if raw.len() < ENTRY_HEADER_LEN {
            return Err(Error::InvalidEntry(format!(
                "entry must be at least {ENTRY_HEADER_LEN} bytes, got {}",
                raw.len()
            )));
        }
        let attitude = raw[0];
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&raw[1..ENTRY_HEADER_LEN]);
        let domain_len = u32::from_be_bytes(len_bytes) as usize;

        let end = ENTRY_HEADER_LEN
            .checked_add(domain_len)
            .filter(|end| *end <= raw.len())
            .ok_or_else(|| {
                Error::InvalidEntry(format!(
                    "declared domain length {domain_len} exceeds the {} bytes available",
                    raw.len() - ENTRY_HEADER_LEN
                ))
            })?;

        let domain_bytes = &raw[ENTRY_HEADER_LEN..end];
        if !domain_bytes.is_ascii() {
            return Err(Error::InvalidEntry(
                "domain name is not valid ASCII".to_string(),
            ));
        }
        let domain_name = String::from_utf8(domain_bytes.to_vec())
            .map_err(|e| Error::InvalidEntry(e.to_string()))?;

        Ok((
            Self {
                domain_name,
                attitude,
            },
            end,
        ))
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain_name, self.attitude)
    }
}

/// Parses `domain:attitude`, e.g. `www.example.com:0`.
impl FromStr for Entry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (domain, attitude) = s.rsplit_once(':').ok_or_else(|| {
            Error::InvalidEntry(format!("{s:?} is not of the form domain:attitude"))
        })?;
        let code: u64 = attitude
            .parse()
            .map_err(|_| Error::InvalidEntry(format!("{attitude:?} is not an attitude code")))?;
        let attitude = u8::try_from(code).map_err(|_| {
            Error::OutOfRange(format!("attitude {code} must be within the range of 0 to 255"))
        })?;
        Self::new(domain, attitude)
    }
}

/// A block of votes linked to its parent by hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    /// Protocol version
    version: u16,
    /// Hash of the parent block, `None` for the genesis block
    prev_hash: Option<Hash>,
    /// Block timestamp (seconds since Unix epoch)
    creation_time: u64,
    /// Nonce used for PoW
    nonce: u32,
    /// Votes carried by this block, in wire order
    entries: Vec<Entry>,
}

impl Block {
    /// Create a new block.
    ///
    /// An all-zero parent hash is the wire sentinel for "no parent" and is
    /// normalised to `None`.
    pub fn new(
        version: u16,
        prev_hash: Option<Hash>,
        creation_time: u64,
        nonce: u32,
        entries: Vec<Entry>,
    ) -> Self {
        Self {
            version,
            prev_hash: prev_hash.filter(|h| !h.is_zero()),
            creation_time,
            nonce,
            entries,
        }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    /// Hash of the parent block, `None` for genesis
    pub fn prev_hash(&self) -> Option<Hash> {
        self.prev_hash
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn nonce(&self) -> u32 {
        self.nonce
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Check if this is the genesis block
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_none()
    }

    /// The same block with a different nonce
    pub fn with_nonce(&self, nonce: u32) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }

    /// Serialize the block to its wire form
    pub fn to_bytes(&self) -> Vec<u8> {
        let body_len: usize = self.entries.iter().map(Entry::encoded_len).sum();
        let mut bytes = Vec::with_capacity(HEADER_LEN + body_len);
        bytes.extend_from_slice(&self.version.to_be_bytes());
        bytes.extend_from_slice(&self.prev_hash.unwrap_or_default().0);
        bytes.extend_from_slice(&self.creation_time.to_be_bytes());
        bytes.extend_from_slice(&self.nonce.to_be_bytes());
        for entry in &self.entries {
            entry.encode_into(&mut bytes);
        }
        bytes
    }

    /// Deserialize a block from its wire form
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN {
            return Err(Error::InvalidBlock(format!(
                "block must be at least {HEADER_LEN} bytes, got {}",
                raw.len()
            )));
        }

        let mut version = [0u8; 2];
        version.copy_from_slice(&raw[0..2]);

        let mut prev_hash = [0u8; HASH_LEN];
        prev_hash.copy_from_slice(&raw[2..NONCE_OFFSET - 8]);

        let mut creation_time = [0u8; 8];
        creation_time.copy_from_slice(&raw[NONCE_OFFSET - 8..NONCE_OFFSET]);

        let mut nonce = [0u8; 4];
        nonce.copy_from_slice(&raw[NONCE_OFFSET..HEADER_LEN]);

        let entries = Entry::decode_chain(&raw[HEADER_LEN..])?;

        Ok(Self::new(
            u16::from_be_bytes(version),
            Some(Hash(prev_hash)),
            u64::from_be_bytes(creation_time),
            u32::from_be_bytes(nonce),
            entries,
        ))
    }

    /// SHA3-256 digest of the serialized block
    pub fn hash(&self) -> Hash {
        hash_bytes(&self.to_bytes())
    }

    pub fn hexdigest(&self) -> String {
        self.hash().to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(domain: &str, attitude: u8) -> Entry {
        Entry::new(domain, attitude).unwrap()
    }

    fn sample_block() -> Block {
        Block::new(
            1,
            Some(hash_bytes(b"parent")),
            1_700_000_000,
            42,
            vec![entry("www.example.com", 0), entry("www.example.net", 1)],
        )
    }

    #[test]
    fn test_entry_wire_layout() {
        let bytes = entry("abc", 7).to_bytes();
        assert_eq!(bytes, vec![7, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_entry_rejects_non_ascii() {
        assert!(matches!(
            Entry::new("bücher.example", 0),
            Err(Error::InvalidHostName(_))
        ));
        assert!(Entry::new("xn--bcher-kva.example", 0).is_ok());
    }

    #[test]
    fn test_entry_from_str() {
        let e: Entry = "www.example.com:1".parse().unwrap();
        assert_eq!(e.domain_name(), "www.example.com");
        assert_eq!(e.attitude(), 1);
        assert!(matches!("a.com:256".parse::<Entry>(), Err(Error::OutOfRange(_))));
        assert!(matches!("a.com".parse::<Entry>(), Err(Error::InvalidEntry(_))));
    }

    #[test]
    fn test_entry_length_mismatch() {
        let mut bytes = entry("abc", 0).to_bytes();
        bytes.push(b'd');
        assert!(matches!(Entry::from_bytes(&bytes), Err(Error::InvalidEntry(_))));
        assert!(matches!(Entry::from_bytes(&bytes[..6]), Err(Error::InvalidEntry(_))));
        assert!(matches!(Entry::from_bytes(&[0, 0, 0]), Err(Error::InvalidEntry(_))));
    }

    #[test]
    fn test_decode_chain_rejects_non_ascii() {
        let raw = [0u8, 0, 0, 0, 2, b'a', 0xC3];
        assert!(matches!(Entry::decode_chain(&raw), Err(Error::InvalidEntry(_))));
    }

    #[test]
    fn test_decode_chain_truncated_header() {
        let mut raw = entry("a.com", 0).to_bytes();
        raw.extend_from_slice(&[1, 0]);
        assert!(matches!(Entry::decode_chain(&raw), Err(Error::InvalidEntry(_))));
    }

    #[test]
    fn test_block_header_serialization() {
        let block = Block::new(1, None, 1234567890, 0, vec![]);
        let bytes = block.to_bytes();
        assert_eq!(bytes.len(), HEADER_LEN);
        assert_eq!(&bytes[0..2], &[0, 1]);
        assert_eq!(&bytes[2..34], &[0u8; 32]);
        assert_eq!(&bytes[34..42], &1234567890u64.to_be_bytes());
        assert_eq!(&bytes[42..46], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_block_roundtrip() {
        let block = sample_block();
        let decoded = Block::from_bytes(&block.to_bytes()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());
    }

    #[test]
    fn test_block_too_short() {
        assert!(matches!(Block::from_bytes(&[0u8; 45]), Err(Error::InvalidBlock(_))));
    }

    #[test]
    fn test_genesis_block_detection() {
        let genesis = Block::new(1, None, 0, 0, vec![]);
        assert!(genesis.is_genesis());
        let zero_parent = Block::new(1, Some(Hash::zero()), 0, 0, vec![]);
        assert!(zero_parent.is_genesis());
        assert_eq!(zero_parent, genesis);
        assert!(!sample_block().is_genesis());
    }

    #[test]
    fn test_nonce_changes_hash() {
        let block = sample_block();
        let other = block.with_nonce(43);
        assert_eq!(other.nonce(), 43);
        assert_ne!(block.hash(), other.hash());
        assert_eq!(block.hexdigest(), block.hash().to_hex());
    }
}
