//! Chain tip bookkeeping
//!
//! The tip set is a single common parent and the blocks directly built on
//! it that have no recorded child. It is persisted as two attributes,
//! `prev_hash` (32 bytes, absent after genesis) and `curr_hashes` (flat
//! concatenation of 32-byte hashes), always written in one batch.

use crate::constants::{ATTR_CURR_HASHES, ATTR_PREV_HASH};
use crate::crypto::{Hash, HASH_LEN};
use crate::error::{Error, Result};
use crate::storage::{AttributeBatch, Storage};

/// How a newly admitted block changed the tip set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TipTransition {
    /// The store was reset to a single genesis tip
    Genesis,
    /// Another child of the common parent; the fork set grew by one
    Sibling,
    /// A child of one tip; the parent advanced and the fork set collapsed
    Extended,
    /// The block's parent is neither the common parent nor a tip.
    /// The block is stored but the tip set is untouched.
    Detached,
}

/// Persisted chain heads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainTips {
    /// Common parent of every tip, `None` when the tips are genesis blocks
    pub parent: Option<Hash>,
    /// Blocks with no recorded child, in admission order
    pub tips: Vec<Hash>,
}

impl ChainTips {
    /// Tip set right after importing a genesis block
    pub fn genesis(hash: Hash) -> Self {
        Self {
            parent: None,
            tips: vec![hash],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    /// Load the tip set; missing attributes read as empty
    pub fn load<S: Storage + ?Sized>(storage: &S) -> Result<Self> {
        let parent = match storage.get_attribute(ATTR_PREV_HASH) {
            Ok(raw) => Some(Hash::from_slice(&raw)?).filter(|h| !h.is_zero()),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        };
        let tips = match storage.get_attribute(ATTR_CURR_HASHES) {
            Ok(raw) => decode_hashes(&raw)?,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        Ok(Self { parent, tips })
    }

    /// Persist both attributes in one atomic write
    pub fn store<S: Storage + ?Sized>(&self, storage: &S) -> Result<()> {
        let mut batch = AttributeBatch::new();
        match self.parent {
            Some(parent) => batch.set(ATTR_PREV_HASH, parent.as_bytes().to_vec()),
            None => batch.delete(ATTR_PREV_HASH),
        };
        batch.set(ATTR_CURR_HASHES, self.encode_tips());
        storage.write_attributes(batch)
    }

    /// The `curr_hashes` attribute value
    pub fn encode_tips(&self) -> Vec<u8> {
        self.tips.iter().flat_map(|h| h.0).collect()
    }

    /// Record a newly admitted block with hash `child` built on `parent`.
    pub fn advance(&mut self, parent: Hash, child: Hash) -> TipTransition {
        if self.parent == Some(parent) {
            self.tips.push(child);
            TipTransition::Sibling
        } else if self.tips.contains(&parent) {
            self.parent = Some(parent);
            self.tips = vec![child];
            TipTransition::Extended
        } else {
            TipTransition::Detached
        }
    }
}

fn decode_hashes(raw: &[u8]) -> Result<Vec<Hash>> {
    if raw.len() % HASH_LEN != 0 {
        return Err(Error::InvalidHash(format!(
            "tip list of {} bytes is not a multiple of {HASH_LEN}",
            raw.len()
        )));
    }
    raw.chunks_exact(HASH_LEN).map(Hash::from_slice).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;
    use crate::storage::MemoryStorage;

    #[test]
    fn test_load_empty_store() {
        let storage = MemoryStorage::new();
        let tips = ChainTips::load(&storage).unwrap();
        assert_eq!(tips, ChainTips::default());
        assert!(tips.is_empty());
    }

    #[test]
    fn test_store_roundtrip() {
        let storage = MemoryStorage::new();
        let tips = ChainTips {
            parent: Some(hash_bytes(b"p")),
            tips: vec![hash_bytes(b"a"), hash_bytes(b"b")],
        };
        tips.store(&storage).unwrap();
        assert_eq!(ChainTips::load(&storage).unwrap(), tips);
        assert_eq!(storage.get_attribute(ATTR_CURR_HASHES).unwrap().len(), 64);
    }

    #[test]
    fn test_genesis_clears_parent() {
        let storage = MemoryStorage::new();
        storage.set_attribute(ATTR_PREV_HASH, &[7u8; 32]).unwrap();
        ChainTips::genesis(hash_bytes(b"g")).store(&storage).unwrap();
        assert!(storage.get_attribute(ATTR_PREV_HASH).is_err());
        assert_eq!(ChainTips::load(&storage).unwrap().tips, vec![hash_bytes(b"g")]);
    }

    #[test]
    fn test_corrupt_tip_list() {
        let storage = MemoryStorage::new();
        storage.set_attribute(ATTR_CURR_HASHES, &[1u8; 33]).unwrap();
        assert!(matches!(ChainTips::load(&storage), Err(Error::InvalidHash(_))));
    }

    #[test]
    fn test_advance_transitions() {
        let (g, a, b, c, x) = (
            hash_bytes(b"g"),
            hash_bytes(b"a"),
            hash_bytes(b"b"),
            hash_bytes(b"c"),
            hash_bytes(b"x"),
        );
        let mut tips = ChainTips::genesis(g);

        assert_eq!(tips.advance(g, a), TipTransition::Extended);
        assert_eq!(tips, ChainTips { parent: Some(g), tips: vec![a] });

        assert_eq!(tips.advance(g, b), TipTransition::Sibling);
        assert_eq!(tips.tips, vec![a, b]);

        assert_eq!(tips.advance(x, c), TipTransition::Detached);
        assert_eq!(tips.tips, vec![a, b]);

        assert_eq!(tips.advance(a, c), TipTransition::Extended);
        assert_eq!(tips, ChainTips { parent: Some(a), tips: vec![c] });
    }
}
