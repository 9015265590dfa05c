//! Storage backends for the ledger.
//!
//! The node persists exactly one record: the latest [`ChainSnapshot`],
//! encoded with bincode 2 under the key [`SNAPSHOT_KEY`]. This module
//! provides the [`SnapshotStore`] abstraction plus:
//!
//! - an in-memory store ([`mem::InMemorySnapshotStore`]) for tests,
//! - a RocksDB-backed store ([`rocksdb::RocksDbSnapshotStore`]) for nodes,
//! - a background writer ([`writer::PersistenceHandle`]) so ledger
//!   mutations never block on disk I/O.

pub mod mem;
pub mod rocksdb;
pub mod writer;

use thiserror::Error;

use crate::ledger::ChainSnapshot;

pub use mem::InMemorySnapshotStore;
pub use rocksdb::{RocksDbConfig, RocksDbSnapshotStore};
pub use writer::PersistenceHandle;

/// Key under which the snapshot record is stored.
pub const SNAPSHOT_KEY: &[u8] = b"blockchain";

/// Storage-level error type.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("rocksdb error: {0}")]
    RocksDb(#[from] ::rocksdb::Error),

    #[error("missing column family: {0}")]
    MissingColumnFamily(&'static str),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("i/o error: {0}")]
    Io(String),
}

/// Durable key/value blob store.
///
/// Implementations must be usable from the persistence writer thread and
/// from startup code at the same time, hence `Send + Sync`.
pub trait SnapshotStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
}

/// Encodes a snapshot into its persisted form.
pub fn encode_snapshot(snapshot: &ChainSnapshot) -> Result<Vec<u8>, StorageError> {
    let cfg = bincode::config::standard();
    Ok(bincode::serde::encode_to_vec(snapshot, cfg)?)
}

/// Decodes a persisted snapshot record.
pub fn decode_snapshot(bytes: &[u8]) -> Result<ChainSnapshot, StorageError> {
    let cfg = bincode::config::standard();
    let (snapshot, _): (ChainSnapshot, usize) = bincode::serde::decode_from_slice(bytes, cfg)?;
    Ok(snapshot)
}

/// Loads the stored snapshot, if one exists.
pub fn load_snapshot(store: &dyn SnapshotStore) -> Result<Option<ChainSnapshot>, StorageError> {
    match store.get(SNAPSHOT_KEY)? {
        None => Ok(None),
        Some(bytes) => decode_snapshot(&bytes).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Blockchain;
    use crate::types::{Address, Amount, Transaction, UserData};

    #[test]
    fn snapshot_record_roundtrip_keeps_chain_hashes() {
        let mut bc = Blockchain::new(Address::from("miner"), 10111);
        bc.push_pending_transaction(Transaction::system_credit(
            Address::from("alice"),
            Amount::coins(1),
        ));
        bc.append_block(7, bc.last_block().compute_hash());
        bc.push_pending_data(UserData::new(Address::from("bob"), vec!["x".into()]));

        let snapshot = bc.snapshot();
        let bytes = encode_snapshot(&snapshot).expect("encode snapshot");
        let decoded = decode_snapshot(&bytes).expect("decode snapshot");

        assert_eq!(decoded, snapshot);
        assert_eq!(
            decoded.chain[1].compute_hash(),
            snapshot.chain[1].compute_hash()
        );
    }

    #[test]
    fn load_snapshot_on_empty_store_is_none() {
        let store = InMemorySnapshotStore::new();
        assert!(load_snapshot(&store).expect("load").is_none());
    }

    #[test]
    fn corrupted_record_is_a_decode_error() {
        let store = InMemorySnapshotStore::new();
        store.put(SNAPSHOT_KEY, &[0xFF, 0xFF, 0xFF]).expect("put");
        assert!(matches!(
            load_snapshot(&store),
            Err(StorageError::Decode(_))
        ));
    }
}
