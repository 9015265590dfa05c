//! Proof-of-work search and verification.
//!
//! A proof is a nonce such that the canonical hash of the candidate block
//!
//! ```text
//! { timeStamp: 0, nonce, previousHash, transactions, data: [] }
//! ```
//!
//! starts with `difficulty` zero hex digits. The commit timestamp and the
//! block's data records are not covered by the proof: the stored
//! block carries the wall-clock time it was appended at, and historical
//! verification re-hashes it with timestamp zero and no data.

use crate::types::block::hash_parts;
use crate::types::{Block, Hash256, Transaction};

/// Number of nonces tried between two abort checks.
pub const ABORT_CHECK_INTERVAL: u64 = 1024;

/// Whether `nonce` is a valid proof for the given candidate.
pub fn valid_proof(
    nonce: u64,
    previous_hash: &Hash256,
    transactions: &[Transaction],
    difficulty: usize,
) -> bool {
    hash_parts(0, nonce, previous_hash, transactions, &[]).leading_zero_nibbles() >= difficulty
}

/// Searches nonces from zero upwards for the smallest valid proof.
///
/// `should_abort` is polled every [`ABORT_CHECK_INTERVAL`] nonces; when it
/// returns `true` the search stops and `None` is returned. `None` is also
/// returned if the nonce space is exhausted.
pub fn search_nonce<F>(
    previous_hash: &Hash256,
    transactions: &[Transaction],
    difficulty: usize,
    mut should_abort: F,
) -> Option<u64>
where
    F: FnMut() -> bool,
{
    let mut nonce: u64 = 0;
    loop {
        if nonce % ABORT_CHECK_INTERVAL == 0 && should_abort() {
            return None;
        }
        if valid_proof(nonce, previous_hash, transactions, difficulty) {
            return Some(nonce);
        }
        nonce = nonce.checked_add(1)?;
    }
}

/// Smallest valid nonce for the candidate, without cancellation.
pub fn proof_of_work(
    previous_hash: &Hash256,
    transactions: &[Transaction],
    difficulty: usize,
) -> Option<u64> {
    search_nonce(previous_hash, transactions, difficulty, || false)
}

/// Re-checks the proof of a stored block.
#[cfg(test)]
pub(crate) fn verify_block_proof(block: &Block, difficulty: usize) -> bool {
    valid_proof(
        block.nonce,
        &block.previous_hash,
        &block.transactions,
        difficulty,
    )
}
