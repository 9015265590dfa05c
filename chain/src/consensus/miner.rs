//! Block mining: reward, proof search and commit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::ledger::Blockchain;
use crate::params::MINING_REWARD;
use crate::types::{Block, Transaction};

use super::config::ConsensusConfig;
use super::error::ConsensusError;
use super::pow;

/// Cancellation signal for in-flight proof searches.
///
/// A search records the generation at its start and gives up once the
/// generation has moved on. Adopting a peer chain bumps the generation so
/// a search over a stale tip stops early.
#[derive(Clone, Debug, Default)]
pub struct AbortSignal(Arc<AtomicU64>);

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Invalidates every search started before this call.
    pub fn abort_in_flight(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_stale(&self, generation: u64) -> bool {
        self.generation() != generation
    }
}

/// A committed block and the time spent finding its proof.
#[derive(Clone, Debug)]
pub struct MinedBlock {
    pub block: Block,
    pub elapsed: Duration,
}

/// Proof-of-work miner.
#[derive(Clone, Debug)]
pub struct Miner {
    config: ConsensusConfig,
    abort: AbortSignal,
}

impl Miner {
    pub fn new(config: ConsensusConfig, abort: AbortSignal) -> Self {
        Self { config, abort }
    }

    pub fn config(&self) -> &ConsensusConfig {
        &self.config
    }

    pub fn abort_signal(&self) -> &AbortSignal {
        &self.abort
    }

    /// Mines one block on top of `ledger`, starting from the current abort
    /// generation.
    pub fn mine(&self, ledger: &mut Blockchain) -> Result<MinedBlock, ConsensusError> {
        self.mine_at(ledger, self.abort.generation())
    }

    /// Mines one block on top of `ledger`.
    ///
    /// `generation` must be read before the caller starts waiting for the
    /// ledger lock: an adoption that bumps the signal while the caller is
    /// queued then aborts this attempt instead of racing it.
    ///
    /// The candidate is the current pool plus a reward credit to the node
    /// address. The reward enters the pool only once a proof is found, so
    /// an empty pool or an aborted search leaves the ledger untouched.
    pub fn mine_at(
        &self,
        ledger: &mut Blockchain,
        generation: u64,
    ) -> Result<MinedBlock, ConsensusError> {
        if self.abort.is_stale(generation) {
            tracing::debug!("chain changed while waiting for the ledger; not mining");
            return Err(ConsensusError::Aborted);
        }
        if ledger.transaction_pool().is_empty() {
            return Err(ConsensusError::NothingToMine);
        }

        let reward = Transaction::system_credit(ledger.address().clone(), MINING_REWARD);

        let mut candidate = ledger.transaction_pool().to_vec();
        candidate.push(reward.clone());
        let previous_hash = ledger.last_block().compute_hash();

        let start = Instant::now();
        let nonce = pow::search_nonce(&previous_hash, &candidate, self.config.difficulty, || {
            self.abort.is_stale(generation)
        });
        let elapsed = start.elapsed();

        let Some(nonce) = nonce else {
            if self.abort.is_stale(generation) {
                tracing::info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    "proof search aborted by chain adoption"
                );
                return Err(ConsensusError::Aborted);
            }
            return Err(ConsensusError::Other("nonce space exhausted".into()));
        };

        ledger.push_pending_transaction(reward);
        let block = ledger.append_block(nonce, previous_hash).clone();

        tracing::info!(
            height = ledger.chain_len() - 1,
            nonce,
            txs = block.transactions.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            hash = %block.compute_hash(),
            "mined block"
        );
        Ok(MinedBlock { block, elapsed })
    }
}
