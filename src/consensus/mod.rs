//! Consensus module - Block structure, proof-of-work and limitations

mod block;
mod limitations;
mod pow;

pub use block::*;
pub use limitations::*;
pub use pow::*;

use crate::error::ConsensusFailure;

/// Run every block-local admission check.
pub fn validate(block: &Block) -> Result<(), ConsensusFailure> {
    if !validate_limitations(block) {
        return Err(ConsensusFailure::LimitationsViolated);
    }
    if !validate_block_hash(block) {
        return Err(ConsensusFailure::InsufficientWork);
    }
    Ok(())
}
