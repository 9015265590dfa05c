//! Background persistence writer.
//!
//! Ledger mutations hand the encoded snapshot to a dedicated OS thread via
//! a channel and return immediately. The writer always persists the most
//! recent record it has received: if several saves queue up while a put is
//! in flight, only the last one is written.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::ledger::ChainSnapshot;

use super::{SNAPSHOT_KEY, SnapshotStore, StorageError, encode_snapshot};

enum WriterMessage {
    Save(Vec<u8>),
    Flush(Sender<()>),
}

/// Cloneable handle to the persistence writer thread.
///
/// The thread exits once every handle has been dropped.
#[derive(Clone)]
pub struct PersistenceHandle {
    tx: Sender<WriterMessage>,
}

impl std::fmt::Debug for PersistenceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceHandle").finish_non_exhaustive()
    }
}

impl PersistenceHandle {
    /// Spawns the writer thread over `store`.
    pub fn spawn(store: Arc<dyn SnapshotStore>) -> Result<(Self, JoinHandle<()>), StorageError> {
        let (tx, rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name("prism-persist".to_string())
            .spawn(move || run_writer(store, rx))
            .map_err(|e| StorageError::Io(e.to_string()))?;
        Ok((Self { tx }, join))
    }

    /// Queues `snapshot` for persistence.
    ///
    /// Encoding happens on the caller's thread so the queued record is an
    /// exact copy of the ledger at call time.
    pub fn save(&self, snapshot: &ChainSnapshot) {
        let bytes = match encode_snapshot(snapshot) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode snapshot for persistence");
                return;
            }
        };
        if self.tx.send(WriterMessage::Save(bytes)).is_err() {
            tracing::warn!("persistence writer is gone; snapshot not saved");
        }
    }

    /// Blocks until every save queued before this call has been written.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        if self.tx.send(WriterMessage::Flush(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv();
    }
}

fn run_writer(store: Arc<dyn SnapshotStore>, rx: Receiver<WriterMessage>) {
    while let Ok(first) = rx.recv() {
        let mut latest: Option<Vec<u8>> = None;
        let mut acks: Vec<Sender<()>> = Vec::new();

        let mut absorb = |msg: WriterMessage| match msg {
            WriterMessage::Save(bytes) => latest = Some(bytes),
            WriterMessage::Flush(ack) => acks.push(ack),
        };
        absorb(first);
        while let Ok(msg) = rx.try_recv() {
            absorb(msg);
        }

        if let Some(bytes) = latest {
            match store.put(SNAPSHOT_KEY, &bytes) {
                Ok(()) => tracing::trace!(bytes = bytes.len(), "snapshot persisted"),
                Err(e) => tracing::error!(error = %e, "failed to persist snapshot"),
            }
        }
        for ack in acks {
            let _ = ack.send(());
        }
    }
    tracing::debug!("persistence writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Blockchain;
    use crate::storage::{InMemorySnapshotStore, load_snapshot};
    use crate::types::{Address, Amount, Transaction};

    #[test]
    fn flush_makes_latest_save_visible() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let (handle, join) = PersistenceHandle::spawn(store.clone()).expect("spawn writer");

        let mut bc = Blockchain::new(Address::from("miner"), 10111);
        handle.save(&bc.snapshot());
        bc.push_pending_transaction(Transaction::system_credit(
            Address::from("alice"),
            Amount::coins(3),
        ));
        handle.save(&bc.snapshot());
        handle.flush();

        let loaded = load_snapshot(store.as_ref())
            .expect("load")
            .expect("snapshot should be stored");
        assert_eq!(loaded.transaction_pool.len(), 1);

        drop(handle);
        join.join().expect("writer thread should exit cleanly");
    }
}
