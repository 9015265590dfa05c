//! Consensus layer: proof-of-work mining and chain selection.
//!
//! This module provides:
//!
//! - configuration parameters ([`config::ConsensusConfig`]),
//! - pure proof-of-work search and verification ([`pow`]),
//! - the block miner with cooperative cancellation ([`miner::Miner`]),
//! - chain integrity checks and the longest-chain fork choice
//!   ([`fork_choice`]).

pub mod config;
pub mod error;
pub mod fork_choice;
pub mod miner;
pub mod pow;

pub use config::ConsensusConfig;
pub use error::ConsensusError;
pub use fork_choice::{
    ChainIntegrityError, ForkChoice, LongestChainForkChoice, LongestChainSelector, verify_chain,
};
pub use miner::{AbortSignal, MinedBlock, Miner};
pub use pow::{proof_of_work, valid_proof};
