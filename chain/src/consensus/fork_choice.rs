//! Fork-choice rule for selecting the best chain among peer snapshots.

use thiserror::Error;

use crate::ledger::ChainSnapshot;
use crate::types::Block;

/// Structural defects that disqualify a chain.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainIntegrityError {
    #[error("chain is empty")]
    Empty,

    #[error("block {index} does not link to the hash of its predecessor")]
    BrokenLink { index: usize },
}

/// Checks the hash-link invariant of a full chain.
///
/// For every `i > 0`, `chain[i].previous_hash` must equal the hash of
/// `chain[i - 1]`.
pub fn verify_chain(chain: &[Block]) -> Result<(), ChainIntegrityError> {
    if chain.is_empty() {
        return Err(ChainIntegrityError::Empty);
    }
    for (i, pair) in chain.windows(2).enumerate() {
        if pair[1].previous_hash != pair[0].compute_hash() {
            return Err(ChainIntegrityError::BrokenLink { index: i + 1 });
        }
    }
    Ok(())
}

/// Abstraction over fork-choice rules.
///
/// Given the current best chain (if any) and a structurally valid
/// candidate, decide whether the candidate should replace it.
pub trait ForkChoice {
    fn should_replace(&self, current: Option<&[Block]>, candidate: &[Block]) -> bool;
}

/// Simple "longest chain by block count" fork choice.
///
/// - With no current chain the candidate always wins.
/// - Otherwise the candidate must be strictly longer; ties keep the
///   current chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct LongestChainForkChoice;

impl ForkChoice for LongestChainForkChoice {
    fn should_replace(&self, current: Option<&[Block]>, candidate: &[Block]) -> bool {
        match current {
            None => true,
            Some(current) => candidate.len() > current.len(),
        }
    }
}

/// Folds a sequence of peer snapshots into a single winner.
///
/// Snapshots failing [`verify_chain`] are discarded on receipt. The first
/// valid snapshot becomes the provisional winner; later ones replace it
/// only when the fork-choice rule prefers them.
#[derive(Debug, Default)]
pub struct LongestChainSelector<F = LongestChainForkChoice> {
    fork_choice: F,
    winner: Option<ChainSnapshot>,
}

impl<F: ForkChoice> LongestChainSelector<F> {
    pub fn new(fork_choice: F) -> Self {
        Self {
            fork_choice,
            winner: None,
        }
    }

    /// Offers a snapshot; returns `true` if it became the winner.
    pub fn offer(&mut self, candidate: ChainSnapshot) -> bool {
        if let Err(e) = verify_chain(&candidate.chain) {
            tracing::debug!(error = %e, len = candidate.chain_len(), "discarding peer chain");
            return false;
        }
        let current = self.winner.as_ref().map(|w| w.chain.as_slice());
        if self.fork_choice.should_replace(current, &candidate.chain) {
            self.winner = Some(candidate);
            return true;
        }
        false
    }

    pub fn winner(&self) -> Option<&ChainSnapshot> {
        self.winner.as_ref()
    }

    pub fn into_winner(self) -> Option<ChainSnapshot> {
        self.winner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Blockchain;
    use crate::types::{Address, HASH_LEN, Hash256};

    fn valid_chain(len: usize) -> ChainSnapshot {
        let mut bc = Blockchain::new(Address::from("peer"), 10111);
        while bc.chain_len() < len {
            let prev = bc.last_block().compute_hash();
            bc.append_block(bc.chain_len() as u64, prev);
        }
        bc.snapshot()
    }

    fn broken_chain(len: usize) -> ChainSnapshot {
        let mut snapshot = valid_chain(len);
        snapshot.chain[len / 2].previous_hash = Hash256([0xEE; HASH_LEN]);
        snapshot
    }

    #[test]
    fn verify_chain_reports_first_broken_link() {
        assert_eq!(verify_chain(&[]), Err(ChainIntegrityError::Empty));
        assert!(verify_chain(&valid_chain(4).chain).is_ok());
        assert_eq!(
            verify_chain(&broken_chain(6).chain),
            Err(ChainIntegrityError::BrokenLink { index: 3 })
        );
    }

    #[test]
    fn longest_chain_fork_choice_requires_strictly_longer() {
        let fc = LongestChainForkChoice;
        let three = valid_chain(3).chain;
        let four = valid_chain(4).chain;

        assert!(fc.should_replace(None, &three));
        assert!(fc.should_replace(Some(three.as_slice()), &four));
        assert!(!fc.should_replace(Some(four.as_slice()), &three));
        assert!(!fc.should_replace(Some(three.as_slice()), &three));
    }

    #[test]
    fn broken_longer_chain_does_not_beat_valid_shorter_one() {
        let mut selector: LongestChainSelector = LongestChainSelector::default();
        assert!(selector.offer(valid_chain(5)));
        assert!(!selector.offer(broken_chain(7)));

        let winner = selector.into_winner().expect("winner");
        assert_eq!(winner.chain_len(), 5);
    }

    #[test]
    fn invalid_first_snapshot_does_not_win() {
        let mut selector: LongestChainSelector = LongestChainSelector::default();
        assert!(!selector.offer(broken_chain(7)));
        assert!(selector.winner().is_none());

        assert!(selector.offer(valid_chain(2)));
        assert!(selector.offer(valid_chain(3)));
        assert!(!selector.offer(valid_chain(3)));
        assert_eq!(selector.winner().map(ChainSnapshot::chain_len), Some(3));
    }
}
