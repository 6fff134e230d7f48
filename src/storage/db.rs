//! Database persistence layer using Sled
//!
//! Blocks and attributes live in two separate sled trees, so a block hash
//! and an attribute name can never collide even when their keys have the
//! same length.

use sled::{Batch, Db, Tree};
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

use super::{attribute_label, AttributeBatch, AttributeOp, BlockIter, Storage};
use crate::consensus::Block;
use crate::crypto::Hash;
use crate::error::{Error, Result};

const BLOCKS_TREE: &str = "blocks";
const ATTRIBUTES_TREE: &str = "attributes";

#[derive(Debug, Clone)]
struct Trees {
    db: Db,
    blocks: Tree,
    attributes: Tree,
}

/// Durable storage backend
#[derive(Debug)]
pub struct SledStorage {
    trees: RwLock<Option<Trees>>,
}

impl SledStorage {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        debug!(path = %path.display(), "opened sled storage");
        Self::from_db(db)
    }

    /// Create a database that is removed when closed or dropped
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let blocks = db.open_tree(BLOCKS_TREE)?;
        let attributes = db.open_tree(ATTRIBUTES_TREE)?;
        Ok(Self {
            trees: RwLock::new(Some(Trees {
                db,
                blocks,
                attributes,
            })),
        })
    }

    fn trees(&self) -> Result<Trees> {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::DatabaseClosed)
    }
}

impl Storage for SledStorage {
    fn get(&self, hash: &Hash) -> Result<Block> {
        match self.trees()?.blocks.get(hash)? {
            Some(bytes) => Block::from_bytes(&bytes),
            None => Err(Error::BlockNotFound(hash.to_hex())),
        }
    }

    fn put(&self, block: &Block) -> Result<()> {
        let trees = self.trees()?;
        trees.blocks.insert(block.hash(), block.to_bytes())?;
        trees.db.flush()?;
        Ok(())
    }

    fn delete(&self, hash: &Hash) -> Result<()> {
        let trees = self.trees()?;
        trees.blocks.remove(hash)?;
        trees.db.flush()?;
        Ok(())
    }

    fn iter_blocks_with_key(&self) -> Result<BlockIter<'_>> {
        let iter = self.trees()?.blocks.iter().map(|item| -> Result<(Hash, Block)> {
            let (key, value) = item?;
            Ok((Hash::from_slice(&key)?, Block::from_bytes(&value)?))
        });
        Ok(Box::new(iter))
    }

    fn get_attribute(&self, name: &[u8]) -> Result<Vec<u8>> {
        self.trees()?
            .attributes
            .get(name)?
            .map(|value| value.to_vec())
            .ok_or_else(|| Error::AttributeNotFound(attribute_label(name)))
    }

    fn set_attribute(&self, name: &[u8], value: &[u8]) -> Result<()> {
        let trees = self.trees()?;
        trees.attributes.insert(name, value)?;
        trees.db.flush()?;
        Ok(())
    }

    fn delete_attribute(&self, name: &[u8]) -> Result<()> {
        let trees = self.trees()?;
        trees.attributes.remove(name)?;
        trees.db.flush()?;
        Ok(())
    }

    fn write_attributes(&self, batch: AttributeBatch) -> Result<()> {
        let trees = self.trees()?;
        let mut sled_batch = Batch::default();
        for (name, op) in batch {
            match op {
                AttributeOp::Set(value) => sled_batch.insert(name, value),
                AttributeOp::Delete => sled_batch.remove(name),
            }
        }
        trees.attributes.apply_batch(sled_batch)?;
        trees.db.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let taken = self
            .trees
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(trees) = taken {
            trees.db.flush()?;
            debug!("closed sled storage");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.trees
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::Entry;

    fn block(nonce: u32) -> Block {
        Block::new(
            1,
            None,
            1_700_000_000,
            nonce,
            vec![Entry::new("www.example.com", 0).unwrap()],
        )
    }

    #[test]
    fn test_put_get_delete() {
        let storage = SledStorage::open_temporary().unwrap();
        let b = block(1);
        storage.put(&b).unwrap();
        storage.put(&b).unwrap();
        assert_eq!(storage.get(&b.hash()).unwrap(), b);

        storage.delete(&b.hash()).unwrap();
        assert!(matches!(storage.get(&b.hash()), Err(Error::BlockNotFound(_))));
        storage.delete(&b.hash()).unwrap();
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let b = block(7);
        {
            let storage = SledStorage::open(dir.path()).unwrap();
            storage.put(&b).unwrap();
            storage.set_attribute(b"name", b"value").unwrap();
            storage.close().unwrap();
        }
        let storage = SledStorage::open(dir.path()).unwrap();
        assert_eq!(storage.get(&b.hash()).unwrap(), b);
        assert_eq!(storage.get_attribute(b"name").unwrap(), b"value");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let storage = SledStorage::open_temporary().unwrap();
        let b = block(3);
        storage.put(&b).unwrap();
        storage.set_attribute(b.hash().as_bytes(), b"attr").unwrap();

        assert_eq!(storage.get(&b.hash()).unwrap(), b);
        assert_eq!(storage.get_attribute(b.hash().as_bytes()).unwrap(), b"attr");
        assert_eq!(storage.iter_blocks().unwrap().count(), 1);
    }

    #[test]
    fn test_write_attributes_batch() {
        let storage = SledStorage::open_temporary().unwrap();
        storage.set_attribute(b"gone", b"x").unwrap();

        let mut batch = AttributeBatch::new();
        batch.set(&b"a"[..], &b"1"[..]).delete(&b"gone"[..]);
        storage.write_attributes(batch).unwrap();

        assert_eq!(storage.get_attribute(b"a").unwrap(), b"1");
        assert!(matches!(storage.get_attribute(b"gone"), Err(Error::AttributeNotFound(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let storage = SledStorage::open_temporary().unwrap();
        assert!(!storage.is_closed());
        storage.close().unwrap();
        storage.close().unwrap();
        assert!(storage.is_closed());
        assert!(matches!(storage.get(&Hash::zero()), Err(Error::DatabaseClosed)));
    }
}
