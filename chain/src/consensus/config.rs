use crate::params::{MINING_DIFFICULTY, MINING_INTERVAL_SECS};

/// Consensus configuration parameters.
///
/// `difficulty` is part of the protocol: every peer must use the same
/// value or blocks mined here will fail verification elsewhere. The
/// interval only paces the local periodic miner.
#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Required number of leading zero hex digits in a block proof.
    pub difficulty: usize,
    /// Pause between periodic mining attempts, in seconds.
    pub mining_interval_secs: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            difficulty: MINING_DIFFICULTY,
            mining_interval_secs: MINING_INTERVAL_SECS,
        }
    }
}
