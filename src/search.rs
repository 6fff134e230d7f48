//! Read-side queries over stored blocks

use std::collections::BTreeMap;

use crate::attitudes;
use crate::chain::ChainTips;
use crate::consensus::Block;
use crate::crypto::Hash;
use crate::error::Result;
use crate::storage::Storage;

/// Walk from a block back towards genesis by following parent hashes.
///
/// The walk ends quietly at genesis or at the first hash that is not
/// stored. Other storage failures are yielded once and end the walk.
#[derive(Debug)]
pub struct BlockWalk<'a, S: ?Sized> {
    storage: &'a S,
    next: Option<Hash>,
}

impl<S: Storage + ?Sized> Iterator for BlockWalk<'_, S> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let hash = self.next.take()?;
        match self.storage.get(&hash) {
            Ok(block) => {
                self.next = block.prev_hash();
                Some(Ok(block))
            }
            Err(e) if e.is_not_found() => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Iterate from `start` back to genesis
pub fn iter_from_block<S: Storage + ?Sized>(storage: &S, start: Hash) -> BlockWalk<'_, S> {
    BlockWalk {
        storage,
        next: Some(start),
    }
}

/// Resolve every tracked tip to its block
pub fn current_blocks<S: Storage + ?Sized>(storage: &S) -> Result<Vec<Block>> {
    ChainTips::load(storage)?
        .tips
        .iter()
        .map(|hash| storage.get(hash))
        .collect()
}

/// Votes per domain, per attitude code
pub type VoteCounts = BTreeMap<String, BTreeMap<u8, u64>>;

/// Count the votes on every domain from `start` back to genesis
pub fn website_votes<S: Storage + ?Sized>(storage: &S, start: Hash) -> Result<VoteCounts> {
    let mut votes = VoteCounts::new();
    for block in iter_from_block(storage, start) {
        for entry in block?.entries() {
            *votes
                .entry(entry.domain_name().to_string())
                .or_default()
                .entry(entry.attitude())
                .or_default() += 1;
        }
    }
    Ok(votes)
}

/// Weighted rating of every domain from `start` back to genesis
pub fn website_rating<S: Storage + ?Sized>(storage: &S, start: Hash) -> Result<BTreeMap<String, i64>> {
    Ok(website_votes(storage, start)?
        .into_iter()
        .map(|(domain, counts)| {
            let rating: i64 = counts
                .into_iter()
                .map(|(attitude, count)| attitudes::weight(attitude) * count as i64)
                .sum();
            (domain, rating)
        })
        .collect())
}
