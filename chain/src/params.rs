//! Protocol constants shared by every node on the network.
//!
//! These values take part in consensus (rewards, proof difficulty) or in
//! admission rules that peers replay when they receive forwarded requests,
//! so they are constants rather than per-node configuration. Tunables that
//! only affect the local node (intervals, timeouts) live in
//! [`crate::config`].

use crate::types::Amount;

/// Reserved sender identity used for mining rewards and joining credits.
///
/// No key pair can derive this value, so transactions carrying it can only
/// be created by the node itself.
pub const SYSTEM_SENDER: &str = "PRISM CHAIN";

/// Number of leading zero hex digits a block hash must have.
pub const MINING_DIFFICULTY: usize = 3;

/// Reward credited to the miner of every committed block.
pub const MINING_REWARD: Amount = Amount::coins(50);

/// One-time credit granted to a new address.
pub const JOINING_FEE: Amount = Amount::coins(10);

/// Percentage of a shared transfer that is redistributed to data contributors.
pub const REWARD_SHARE_PERCENT: u64 = 5;

/// Default interval between periodic mining attempts.
pub const MINING_INTERVAL_SECS: u64 = 20;

/// Default interval between periodic peer resync rounds.
pub const RESYNC_INTERVAL_SECS: u64 = 10;

/// Port peers serve the chain-sync wire contract on.
pub const DEFAULT_PEER_PORT: u16 = 10111;
