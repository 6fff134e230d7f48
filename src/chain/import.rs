//! Block import pipeline
//!
//! Validates a candidate block against its stored parent and the block-local
//! consensus rules, stores it, and updates the persisted tip set.

use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use super::tips::{ChainTips, TipTransition};
use crate::consensus::{self, Block};
use crate::crypto::Hash;
use crate::error::{ConsensusFailure, Error, Result};
use crate::storage::Storage;

/// Import a block into storage.
///
/// A genesis block (no parent) skips every check and resets the tip set
/// to itself. Any other block must have a stored parent that is not newer
/// than it and must pass the limitations and proof-of-work checks; nothing
/// is written when it does not.
///
/// Callers sharing one storage handle across threads must serialize
/// imports, see [`Chain`].
pub fn import_block<S: Storage + ?Sized>(storage: &S, block: &Block) -> Result<TipTransition> {
    let hash = block.hash();
    let Some(prev_hash) = block.prev_hash() else {
        storage.put(block)?;
        ChainTips::genesis(hash).store(storage)?;
        info!(%hash, "imported genesis block");
        return Ok(TipTransition::Genesis);
    };

    if let Err(failure) = check_admission(storage, block, &prev_hash) {
        warn!(%hash, %prev_hash, %failure, "rejected block");
        return Err(failure);
    }
    storage.put(block)?;

    let mut tips = ChainTips::load(storage)?;
    let transition = tips.advance(prev_hash, hash);
    match transition {
        TipTransition::Detached => {
            warn!(%hash, %prev_hash, "stored block outside the tracked tip set")
        }
        _ => {
            tips.store(storage)?;
            info!(%hash, ?transition, tips = tips.tips.len(), "imported block");
        }
    }
    Ok(transition)
}

fn check_admission<S: Storage + ?Sized>(storage: &S, block: &Block, prev_hash: &Hash) -> Result<()> {
    let parent = match storage.get(prev_hash) {
        Ok(parent) => parent,
        Err(e) if e.is_not_found() => return Err(ConsensusFailure::PreviousBlockNotFound.into()),
        Err(e) => return Err(e),
    };
    if parent.creation_time() > block.creation_time() {
        return Err(ConsensusFailure::EarlierThanPrevious.into());
    }
    consensus::validate(block).map_err(Error::from)
}

/// A storage handle whose imports are serialized.
///
/// The tip update is a read-modify-write over the tip attributes, so two
/// concurrent imports on the same store must not interleave.
#[derive(Debug)]
pub struct Chain<S> {
    storage: S,
    import_lock: Mutex<()>,
}

impl<S: Storage> Chain<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            import_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Import a block while holding the import lock
    pub fn import(&self, block: &Block) -> Result<TipTransition> {
        let _guard = self
            .import_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        import_block(&self.storage, block)
    }

    /// Current tip set
    pub fn tips(&self) -> Result<ChainTips> {
        ChainTips::load(&self.storage)
    }

    pub fn get(&self, hash: &Hash) -> Result<Block> {
        self.storage.get(hash)
    }

    pub fn close(&self) -> Result<()> {
        self.storage.close()
    }
}
