//! Volatile in-memory storage backend.
//!
//! Everything vanishes when the backend is closed or dropped, which makes
//! it the backend of choice for tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{attribute_label, AttributeBatch, AttributeOp, BlockIter, Storage};
use crate::consensus::Block;
use crate::crypto::Hash;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct Maps {
    blocks: HashMap<Hash, Block>,
    attributes: HashMap<Vec<u8>, Vec<u8>>,
}

/// In-memory storage backend
#[derive(Debug)]
pub struct MemoryStorage {
    maps: RwLock<Option<Maps>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            maps: RwLock::new(Some(Maps::default())),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&Maps) -> Result<T>) -> Result<T> {
        let guard = self.maps.read().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_ref().ok_or(Error::DatabaseClosed)?)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Maps) -> Result<T>) -> Result<T> {
        let mut guard = self.maps.write().unwrap_or_else(PoisonError::into_inner);
        f(guard.as_mut().ok_or(Error::DatabaseClosed)?)
    }
}

impl Storage for MemoryStorage {
    fn get(&self, hash: &Hash) -> Result<Block> {
        self.read(|maps| {
            maps.blocks
                .get(hash)
                .cloned()
                .ok_or_else(|| Error::BlockNotFound(hash.to_hex()))
        })
    }

    fn put(&self, block: &Block) -> Result<()> {
        self.write(|maps| {
            maps.blocks.insert(block.hash(), block.clone());
            Ok(())
        })
    }

    fn delete(&self, hash: &Hash) -> Result<()> {
        self.write(|maps| {
            maps.blocks.remove(hash);
            Ok(())
        })
    }

    fn iter_blocks_with_key(&self) -> Result<BlockIter<'_>> {
        // Snapshot so the lock is not held while the caller iterates.
        let snapshot: Vec<(Hash, Block)> = self.read(|maps| {
            Ok(maps
                .blocks
                .iter()
                .map(|(hash, block)| (*hash, block.clone()))
                .collect())
        })?;
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn get_attribute(&self, name: &[u8]) -> Result<Vec<u8>> {
        self.read(|maps| {
            maps.attributes
                .get(name)
                .cloned()
                .ok_or_else(|| Error::AttributeNotFound(attribute_label(name)))
        })
    }

    fn set_attribute(&self, name: &[u8], value: &[u8]) -> Result<()> {
        self.write(|maps| {
            maps.attributes.insert(name.to_vec(), value.to_vec());
            Ok(())
        })
    }

    fn delete_attribute(&self, name: &[u8]) -> Result<()> {
        self.write(|maps| {
            maps.attributes.remove(name);
            Ok(())
        })
    }

    fn write_attributes(&self, batch: AttributeBatch) -> Result<()> {
        self.write(|maps| {
            for (name, op) in batch {
                match op {
                    AttributeOp::Set(value) => {
                        maps.attributes.insert(name, value);
                    }
                    AttributeOp::Delete => {
                        maps.attributes.remove(&name);
                    }
                }
            }
            Ok(())
        })
    }

    fn close(&self) -> Result<()> {
        self.maps
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.maps
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}
