//! RocksDB-backed snapshot store.
//!
//! All records live in a dedicated `"ledger"` column family. The
//! `"default"` family is opened as well to keep RocksDB happy but is
//! otherwise unused.

use std::path::Path;

use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options};

use super::{SnapshotStore, StorageError};

const LEDGER_CF: &str = "ledger";

/// Configuration for [`RocksDbSnapshotStore`].
#[derive(Clone, Debug)]
pub struct RocksDbConfig {
    /// Filesystem path to the RocksDB database directory.
    pub path: String,
    /// Whether to create the database and missing column families if they
    /// do not yet exist.
    pub create_if_missing: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "data/prism-db".to_string(),
            create_if_missing: true,
        }
    }
}

/// RocksDB-backed implementation of [`SnapshotStore`].
pub struct RocksDbSnapshotStore {
    db: DB,
}

impl RocksDbSnapshotStore {
    /// Opens (or creates) the store at `cfg.path`.
    pub fn open(cfg: &RocksDbConfig) -> Result<Self, StorageError> {
        let path = Path::new(&cfg.path);

        let mut opts = Options::default();
        opts.create_if_missing(cfg.create_if_missing);
        opts.create_missing_column_families(cfg.create_if_missing);

        let cfs = vec![
            ColumnFamilyDescriptor::new("default", Options::default()),
            ColumnFamilyDescriptor::new(LEDGER_CF, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, cfs)?;
        tracing::debug!(path = %cfg.path, "opened rocksdb snapshot store");

        Ok(Self { db })
    }

    fn cf_ledger(&self) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(LEDGER_CF)
            .ok_or(StorageError::MissingColumnFamily(LEDGER_CF))
    }
}

impl SnapshotStore for RocksDbSnapshotStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf_ledger()?;
        Ok(self.db.get_cf(cf, key)?)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf_ledger()?;
        self.db.put_cf(cf, key, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Blockchain;
    use crate::storage::{SNAPSHOT_KEY, encode_snapshot, load_snapshot};
    use crate::types::Address;
    use tempfile::TempDir;

    fn open_tmp(tmp: &TempDir) -> RocksDbSnapshotStore {
        let cfg = RocksDbConfig {
            path: tmp.path().to_string_lossy().to_string(),
            create_if_missing: true,
        };
        RocksDbSnapshotStore::open(&cfg).expect("open RocksDB")
    }

    #[test]
    fn rocksdb_store_roundtrip_snapshot() {
        let tmp = TempDir::new().expect("create temp dir");
        let store = open_tmp(&tmp);

        assert!(load_snapshot(&store).expect("load").is_none());

        let bc = Blockchain::new(Address::from("miner"), 10111);
        let bytes = encode_snapshot(&bc.snapshot()).expect("encode");
        store.put(SNAPSHOT_KEY, &bytes).expect("put");

        let loaded = load_snapshot(&store)
            .expect("load")
            .expect("snapshot should exist");
        assert_eq!(loaded.chain, bc.blocks());
    }

    #[test]
    fn record_survives_reopen() {
        let tmp = TempDir::new().expect("create temp dir");
        {
            let store = open_tmp(&tmp);
            store.put(SNAPSHOT_KEY, b"payload").expect("put");
        }
        let store = open_tmp(&tmp);
        assert_eq!(
            store.get(SNAPSHOT_KEY).expect("get"),
            Some(b"payload".to_vec())
        );
    }
}
