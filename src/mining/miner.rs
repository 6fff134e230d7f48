//! Block miner implementation
//!
//! Searches the nonce space of a candidate block for a hash that meets
//! the proof-of-work target. The header is serialized once per worker and
//! only the four nonce bytes are rewritten between attempts.

use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::consensus::{meets_target, Block, Entry, NONCE_OFFSET};
use crate::constants::HEADER_LEN;
use crate::crypto::{hash_bytes, Hash};
use crate::error::{Error, Result};

/// Mining result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningResult {
    /// Found a block satisfying the target
    Success { block: Block, nonce: u32 },
    /// Every nonce in range was tried without success
    Exhausted,
    /// Mining was interrupted through the stop signal
    Interrupted,
}

impl MiningResult {
    pub fn into_solution(self) -> Option<(Block, u32)> {
        match self {
            MiningResult::Success { block, nonce } => Some((block, nonce)),
            _ => None,
        }
    }
}

/// The immutable fields shared by every candidate block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTemplate {
    pub version: u16,
    pub prev_hash: Option<Hash>,
    pub creation_time: u64,
    pub entries: Vec<Entry>,
}

impl BlockTemplate {
    pub fn new(
        version: u16,
        prev_hash: Option<Hash>,
        creation_time: u64,
        entries: Vec<Entry>,
    ) -> Self {
        Self {
            version,
            prev_hash,
            creation_time,
            entries,
        }
    }

    /// Build the candidate block for one nonce
    pub fn block(&self, nonce: u32) -> Block {
        Block::new(
            self.version,
            self.prev_hash,
            self.creation_time,
            nonce,
            self.entries.clone(),
        )
    }

    /// Try every nonce in `nonces`, returning the first one whose hash
    /// satisfies `powf`. Gives up as soon as `cancelled(nonce)` holds.
    fn search<F, C>(&self, nonces: Range<u32>, powf: &F, cancelled: C) -> Option<u32>
    where
        F: Fn(&Hash) -> bool,
        C: Fn(u32) -> bool,
    {
        let mut candidate = self.block(0).to_bytes();
        for nonce in nonces {
            if cancelled(nonce) {
                return None;
            }
            candidate[NONCE_OFFSET..HEADER_LEN].copy_from_slice(&nonce.to_be_bytes());
            if powf(&hash_bytes(&candidate)) {
                return Some(nonce);
            }
        }
        None
    }
}

fn check_max_tries(max_tries: u64) -> Result<u32> {
    u32::try_from(max_tries)
        .map_err(|_| Error::OutOfRange(format!("max_tries must not exceed {}", u32::MAX)))
}

/// Attempt the proof of work sequentially over nonces `0..max_tries`.
///
/// Returns `Ok(None)` when no nonce in range satisfies the target.
pub fn attempt(
    version: u16,
    prev_hash: Option<Hash>,
    creation_time: u64,
    entries: Vec<Entry>,
    max_tries: u64,
) -> Result<Option<(Block, u32)>> {
    let template = BlockTemplate::new(version, prev_hash, creation_time, entries);
    attempt_with(&template, max_tries, meets_target)
}

/// Sequential search with a caller-supplied acceptance predicate
pub fn attempt_with<F>(template: &BlockTemplate, max_tries: u64, powf: F) -> Result<Option<(Block, u32)>>
where
    F: Fn(&Hash) -> bool,
{
    let max_tries = check_max_tries(max_tries)?;
    let found = template.search(0..max_tries, &powf, |_| false);
    debug!(?found, max_tries, "sequential nonce search finished");
    Ok(found.map(|nonce| (template.block(nonce), nonce)))
}

/// Block miner
///
/// Splits the nonce range across worker threads that share one candidate
/// template and race to the lowest satisfying nonce.
#[derive(Debug, Clone)]
pub struct Miner {
    /// Number of worker threads
    threads: usize,
    /// Stop signal
    stop_signal: Arc<AtomicBool>,
}

impl Miner {
    /// Create a new miner
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Get a stop signal handle
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_signal)
    }

    /// Stop mining
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Reset stop signal
    pub fn reset(&self) {
        self.stop_signal.store(false, Ordering::SeqCst);
    }

    /// Mine a block against the chain's difficulty target
    pub fn mine(&self, template: &BlockTemplate, max_tries: u64) -> Result<MiningResult> {
        self.mine_with(template, max_tries, meets_target)
    }

    /// Mine a block with a caller-supplied acceptance predicate.
    ///
    /// Nonces `0..max_tries` are split into contiguous ranges, one per
    /// worker. A worker abandons its range once a lower nonce has been
    /// found elsewhere, so the result is the lowest satisfying nonce.
    pub fn mine_with<F>(&self, template: &BlockTemplate, max_tries: u64, powf: F) -> Result<MiningResult>
    where
        F: Fn(&Hash) -> bool + Sync,
    {
        let max_tries = check_max_tries(max_tries)?;
        let ranges = partition(max_tries, self.threads);
        let best = AtomicU32::new(u32::MAX);

        let winner = std::thread::scope(|scope| {
            let workers: Vec<_> = ranges
                .into_iter()
                .map(|range| {
                    let best = &best;
                    let stop = self.stop_signal.as_ref();
                    let powf = &powf;
                    scope.spawn(move || {
                        let nonce = template.search(range, powf, |nonce| {
                            stop.load(Ordering::Relaxed) || nonce > best.load(Ordering::Relaxed)
                        });
                        if let Some(nonce) = nonce {
                            best.fetch_min(nonce, Ordering::SeqCst);
                        }
                        nonce
                    })
                })
                .collect();

            workers
                .into_iter()
                .filter_map(|worker| worker.join().unwrap_or(None))
                .min()
        });

        let result = match winner {
            Some(nonce) => MiningResult::Success {
                block: template.block(nonce),
                nonce,
            },
            None if self.stop_signal.load(Ordering::SeqCst) => MiningResult::Interrupted,
            None => MiningResult::Exhausted,
        };
        debug!(threads = self.threads, max_tries, outcome = ?winner, "parallel nonce search finished");
        Ok(result)
    }
}

/// Split `0..total` into at most `parts` contiguous, non-empty ranges
fn partition(total: u32, parts: usize) -> Vec<Range<u32>> {
    let total = u64::from(total);
    let parts = (parts.max(1) as u64).min(total.max(1));
    let chunk = total.div_ceil(parts);
    (0..parts)
        .map(|i| {
            let start = (i * chunk).min(total);
            let end = ((i + 1) * chunk).min(total);
            // Both bounds are <= total, which came from a u32.
            start as u32..end as u32
        })
        .filter(|range| !range.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::validate_block_hash;

    fn template() -> BlockTemplate {
        BlockTemplate::new(
            1,
            Some(hash_bytes(b"parent")),
            1_700_000_000,
            vec![Entry::new("www.example.com", 0).unwrap()],
        )
    }

    #[test]
    fn test_attempt_finds_valid_block() {
        let t = template();
        let (block, nonce) = attempt(1, t.prev_hash, t.creation_time, t.entries.clone(), u32::MAX as u64)
            .unwrap()
            .expect("a solution exists well within the nonce space");
        assert_eq!(block.nonce(), nonce);
        assert!(validate_block_hash(&block));
        assert!(meets_target(&block.hash()));
    }

    #[test]
    fn test_attempt_rejects_oversized_range() {
        let t = template();
        let result = attempt(1, t.prev_hash, 0, t.entries, u32::MAX as u64 + 1);
        assert!(matches!(result, Err(Error::OutOfRange(_))));
    }

    #[test]
    fn test_attempt_exhausted() {
        let found = attempt_with(&template(), 16, |_| false).unwrap();
        assert!(found.is_none());
        assert!(attempt_with(&template(), 0, |_| true).unwrap().is_none());
    }

    #[test]
    fn test_attempt_returns_first_match() {
        let (block, nonce) = attempt_with(&template(), 100, |_| true).unwrap().unwrap();
        assert_eq!(nonce, 0);
        assert_eq!(block, template().block(0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let t = template();
        let target = crate::consensus::target_with_zero_bytes(1);
        let powf = |h: &Hash| crate::consensus::hash_meets(h, &target);

        let sequential = attempt_with(&t, 1 << 16, powf).unwrap();
        let parallel = Miner::new(4).mine_with(&t, 1 << 16, powf).unwrap();
        assert_eq!(parallel.into_solution(), sequential);
    }

    #[test]
    fn test_parallel_exhausted_and_interrupted() {
        let miner = Miner::new(3);
        assert_eq!(
            miner.mine_with(&template(), 10, |_| false).unwrap(),
            MiningResult::Exhausted
        );

        miner.stop();
        assert_eq!(
            miner.mine_with(&template(), 10, |_| false).unwrap(),
            MiningResult::Interrupted
        );
        miner.reset();
    }

    #[test]
    fn test_partition_covers_range() {
        let ranges = partition(10, 3);
        assert_eq!(ranges, vec![0..4, 4..8, 8..10]);
        assert_eq!(partition(2, 8), vec![0..1, 1..2]);
        assert!(partition(0, 4).is_empty());
        assert_eq!(partition(u32::MAX, 1), vec![0..u32::MAX]);
    }

    #[test]
    fn test_miner_stop_signal() {
        let miner = Miner::new(1);
        let signal = miner.stop_signal();

        assert!(!signal.load(Ordering::SeqCst));

        miner.stop();
        assert!(signal.load(Ordering::SeqCst));

        miner.reset();
        assert!(!signal.load(Ordering::SeqCst));
    }
}
