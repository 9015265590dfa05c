//! Chain library crate.
//!
//! This crate provides the building blocks of a Prism ledger node:
//!
//! - strongly-typed domain types and protocol constants (`types`, `params`),
//! - key pairs, signatures and address derivation (`crypto`),
//! - the ledger with balance replay and transaction admission (`ledger`),
//! - proof-of-work mining and longest-valid-chain selection (`consensus`),
//! - relay discovery and the peer chain-sync protocol (`network`),
//! - snapshot storage backends and the persistence writer (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - node orchestration tying these together (`node`),
//! - and a top-level node configuration (`config`).
//!
//! The `prism-node` binary serves the HTTP surface on top of [`Node`].

pub mod config;
pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod metrics;
pub mod network;
pub mod node;
pub mod params;
pub mod storage;
pub mod types;

// Re-export top-level configuration types.
pub use config::{MetricsConfig, NetworkConfig, NodeConfig};

// Re-export "core" consensus types and traits.
pub use consensus::{
    AbortSignal, ChainIntegrityError, ConsensusConfig, ConsensusError, ForkChoice,
    LongestChainForkChoice, LongestChainSelector, MinedBlock, Miner, verify_chain,
};

pub use crypto::{
    CryptoError, KeyPair, PublicKey, Signature, derive_address, is_valid_address,
    verify_transaction,
};

pub use ledger::{AdmissionError, Blockchain, ChainSnapshot, TransactionRequest};

pub use network::{
    ChainSync, HttpPeerClient, HttpRelayClient, NetworkError, PeerClient, PeerDirectory,
    RelayClient,
};

// Re-export storage backends.
pub use storage::{
    InMemorySnapshotStore, PersistenceHandle, RocksDbConfig, RocksDbSnapshotStore, SnapshotStore,
    StorageError,
};

// Re-export metrics registry and ledger metrics.
pub use metrics::{LedgerMetrics, MetricsRegistry, run_prometheus_http_server};

pub use node::{Node, SharedLedger};

// Re-export domain types at the crate root for convenience.
pub use types::*;
