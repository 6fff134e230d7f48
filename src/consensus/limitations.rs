//! Power-unrelated limitations on blocks

use std::collections::HashSet;

use crate::consensus::Block;
use crate::constants::MAX_ENTRIES;

/// Check the structural admission rules of a block.
///
/// A block must carry between one and `MAX_ENTRIES` entries, and no two
/// of them may vote on the same domain.
pub fn validate_limitations(block: &Block) -> bool {
    let entries = block.entries();
    if entries.is_empty() || entries.len() > MAX_ENTRIES {
        return false;
    }

    let mut seen = HashSet::with_capacity(entries.len());
    entries.iter().all(|entry| seen.insert(entry.domain_name()))
}
