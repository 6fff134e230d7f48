//! Proof-of-work validation
//!
//! A block hash, read as a big-endian 256-bit integer, must not exceed
//! the target: `ZERO_BYTES` leading zero bytes followed by `0xFF`.

use crate::consensus::Block;
use crate::constants::ZERO_BYTES;
use crate::crypto::{Hash, HASH_LEN};

/// The largest admissible block hash
pub const DIFFICULTY_TARGET: [u8; HASH_LEN] = target_with_zero_bytes(ZERO_BYTES);

/// Build a target whose top `zero_bytes` bytes are zero and the rest `0xFF`
pub const fn target_with_zero_bytes(zero_bytes: usize) -> [u8; HASH_LEN] {
    let mut target = [0xFFu8; HASH_LEN];
    let mut i = 0;
    while i < zero_bytes && i < HASH_LEN {
        target[i] = 0;
        i += 1;
    }
    target
}

/// Compare hash to target (hash <= target), never accepting the zero hash.
///
/// The zero hash is reserved as the "no parent" sentinel.
pub fn hash_meets(hash: &Hash, target: &[u8; HASH_LEN]) -> bool {
    // Byte arrays compare lexicographically, which is big-endian order.
    !hash.is_zero() && hash.0 <= *target
}

/// Check a hash against the chain's difficulty target
pub fn meets_target(hash: &Hash) -> bool {
    hash_meets(hash, &DIFFICULTY_TARGET)
}

/// Validate the proof of work of a block
pub fn validate_block_hash(block: &Block) -> bool {
    meets_target(&block.hash())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_bytes;

    #[test]
    fn test_target_layout() {
        assert_eq!(DIFFICULTY_TARGET[0], 0);
        assert_eq!(DIFFICULTY_TARGET[1], 0);
        assert!(DIFFICULTY_TARGET[2..].iter().all(|b| *b == 0xFF));
        assert_eq!(target_with_zero_bytes(0), [0xFF; 32]);
        assert_eq!(target_with_zero_bytes(40), [0u8; 32]);
    }

    #[test]
    fn test_boundary_hashes() {
        assert!(meets_target(&Hash(DIFFICULTY_TARGET)));

        let mut just_above = [0u8; 32];
        just_above[1] = 1;
        assert!(!meets_target(&Hash(just_above)));

        let mut smallest = [0u8; 32];
        smallest[31] = 1;
        assert!(meets_target(&Hash(smallest)));
    }

    #[test]
    fn test_zero_hash_never_meets() {
        assert!(!meets_target(&Hash::zero()));
        assert!(!hash_meets(&Hash::zero(), &[0xFF; 32]));
    }

    #[test]
    fn test_compare_to_target() {
        let hash = hash_bytes(b"test");
        assert!(hash_meets(&hash, &[0xFF; 32]));
        assert!(!hash_meets(&hash, &[0x00; 32]));
    }
}
