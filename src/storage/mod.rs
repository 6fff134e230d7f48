//! Storage module - block and attribute persistence
//!
//! Every backend exposes two disjoint keyspaces: blocks addressed by their
//! own hash, and small named attributes holding chain metadata.

mod batch;
pub mod db;
mod memory;

pub use batch::{AttributeBatch, AttributeOp};
pub use db::SledStorage;
pub use memory::MemoryStorage;

use crate::consensus::Block;
use crate::crypto::Hash;
use crate::error::Result;

/// Iterator over stored blocks and their keys
pub type BlockIter<'a> = Box<dyn Iterator<Item = Result<(Hash, Block)>> + 'a>;

/// Storage backend contract.
///
/// Every operation on a closed backend fails with `Error::DatabaseClosed`.
pub trait Storage: Send + Sync {
    /// Get a block by hash, failing with `BlockNotFound` if absent
    fn get(&self, hash: &Hash) -> Result<Block>;

    /// Store a block under its own hash. Storing the same block twice is a no-op.
    fn put(&self, block: &Block) -> Result<()>;

    /// Remove a block. Removing an absent block is a no-op.
    fn delete(&self, hash: &Hash) -> Result<()>;

    /// Iterate over every stored block with its hash, unordered.
    ///
    /// Each call starts a fresh pass.
    fn iter_blocks_with_key(&self) -> Result<BlockIter<'_>>;

    /// Iterate over every stored block, unordered
    fn iter_blocks(&self) -> Result<Box<dyn Iterator<Item = Result<Block>> + '_>> {
        Ok(Box::new(
            self.iter_blocks_with_key()?
                .map(|item| item.map(|(_, block)| block)),
        ))
    }

    /// Get a block by a raw key, failing with `InvalidHash` unless it is 32 bytes
    fn get_by_slice(&self, key: &[u8]) -> Result<Block> {
        self.get(&Hash::from_slice(key)?)
    }

    /// Check whether a block is stored
    fn contains(&self, hash: &Hash) -> Result<bool> {
        match self.get(hash) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Get an attribute, failing with `AttributeNotFound` if absent
    fn get_attribute(&self, name: &[u8]) -> Result<Vec<u8>>;

    /// Set an attribute
    fn set_attribute(&self, name: &[u8], value: &[u8]) -> Result<()>;

    /// Delete an attribute. Deleting an absent attribute is a no-op.
    fn delete_attribute(&self, name: &[u8]) -> Result<()>;

    /// Apply several attribute writes atomically
    fn write_attributes(&self, batch: AttributeBatch) -> Result<()>;

    /// Close the backend. Closing twice is a no-op.
    fn close(&self) -> Result<()>;

    fn is_closed(&self) -> bool;
}

/// Render an attribute name for error messages
pub(crate) fn attribute_label(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}
