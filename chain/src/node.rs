//! Node orchestration.
//!
//! A [`Node`] owns the single authoritative ledger instance and wires it to
//! the miner, the sync protocol, persistence and metrics. HTTP handlers and
//! the two background tasks (periodic miner, periodic resync) all go
//! through it.
//!
//! Locking: the ledger sits behind one `tokio::sync::Mutex`. Handlers lock
//! with `.lock().await`; the miner runs on the blocking pool and uses
//! `blocking_lock`, holding the lock for the whole proof search. Adopting a
//! longer chain first marks itself pending and bumps the [`AbortSignal`] so
//! an in-flight search gives the lock back quickly, then takes the lock and
//! replaces the ledger. A mining attempt that obtains the lock while an
//! adoption is pending, or after the generation it read before queueing
//! has moved on, aborts without touching the ledger.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::config::NodeConfig;
use crate::consensus::{AbortSignal, ConsensusError, MinedBlock, Miner, verify_chain};
use crate::ledger::{Blockchain, ChainSnapshot, TransactionRequest};
use crate::metrics::MetricsRegistry;
use crate::network::ChainSync;
use crate::storage::{PersistenceHandle, SnapshotStore, StorageError, load_snapshot};
use crate::types::{Address, Balance, Transaction, UserData};

/// The shared ledger handle.
pub type SharedLedger = Arc<Mutex<Blockchain>>;

pub struct Node {
    ledger: SharedLedger,
    sync: ChainSync,
    miner: Miner,
    metrics: Arc<MetricsRegistry>,
    persistence: PersistenceHandle,
    /// Chain length as of the last commit or adoption, readable without
    /// the ledger lock.
    committed_len: AtomicUsize,
    /// Adoptions that have bumped the abort signal but not yet finished.
    adoptions_pending: Arc<AtomicUsize>,
    stop_tx: watch::Sender<bool>,
    mining_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    resync_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Node {
    /// Builds the ledger and joins the network.
    ///
    /// Startup order: load the stored snapshot, bootstrap against the relay
    /// and peers, then adopt the best peer chain if it is longer than the
    /// stored one (or nothing is stored). Otherwise the stored chain is
    /// used, or a fresh genesis chain on first boot.
    ///
    /// Only storage read failures are fatal. A stored record that fails to
    /// decode is logged and ignored.
    pub async fn start(
        config: NodeConfig,
        address: Address,
        store: Arc<dyn SnapshotStore>,
        sync: ChainSync,
        metrics: Arc<MetricsRegistry>,
    ) -> Result<Arc<Self>, StorageError> {
        let port = config.network.peer_port;

        let stored = match load_snapshot(store.as_ref()) {
            Ok(stored) => stored,
            Err(StorageError::Decode(e)) => {
                tracing::warn!(error = %e, "stored snapshot is unreadable; ignoring it");
                None
            }
            Err(e) => return Err(e),
        };
        let stored_len = stored.as_ref().map(ChainSnapshot::chain_len).unwrap_or(0);

        let winner = sync.bootstrap().await;
        let ledger = match (stored, winner) {
            (_, Some(winner)) if winner.chain_len() > stored_len => {
                tracing::info!(
                    len = winner.chain_len(),
                    stored_len,
                    "adopting peer chain at startup"
                );
                metrics.ledger.chains_adopted.inc();
                Blockchain::from_snapshot(winner, address, port)
            }
            (Some(stored), _) => {
                tracing::info!(len = stored.chain_len(), "restored chain from storage");
                Blockchain::from_snapshot(stored, address, port)
            }
            (None, _) => {
                tracing::info!("starting a fresh chain");
                Blockchain::new(address, port)
            }
        };

        // The writer thread is detached; `shutdown` flushes it.
        let (persistence, _writer) = PersistenceHandle::spawn(store)?;
        let ledger = ledger.with_persistence(persistence.clone());
        ledger.persist();

        let committed_len = ledger.chain_len();
        metrics.ledger.chain_length.set(committed_len as i64);
        metrics.ledger.known_peers.set(sync.peers().len() as i64);

        let (stop_tx, _) = watch::channel(false);
        Ok(Arc::new(Self {
            ledger: Arc::new(Mutex::new(ledger)),
            sync,
            miner: Miner::new(config.consensus, AbortSignal::new()),
            metrics,
            persistence,
            committed_len: AtomicUsize::new(committed_len),
            adoptions_pending: Arc::new(AtomicUsize::new(0)),
            stop_tx,
            mining_task: std::sync::Mutex::new(None),
            resync_task: std::sync::Mutex::new(None),
        }))
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn sync(&self) -> &ChainSync {
        &self.sync
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn committed_len(&self) -> usize {
        self.committed_len.load(Ordering::Acquire)
    }

    /// Full copy of the ledger state.
    pub async fn snapshot(&self) -> ChainSnapshot {
        self.ledger.lock().await.snapshot()
    }

    /// Admits a locally submitted request and forwards it to every peer.
    pub async fn submit_transaction(&self, request: TransactionRequest) -> bool {
        if !self.admit_request(&request).await {
            return false;
        }
        self.sync.propagate_transaction(&request).await;
        true
    }

    /// Admits a request forwarded by a peer, without re-propagating it.
    pub async fn receive_transaction(&self, request: TransactionRequest) -> bool {
        self.admit_request(&request).await
    }

    async fn admit_request(&self, request: &TransactionRequest) -> bool {
        let result = self.ledger.lock().await.try_submit(request);
        match result {
            Ok(parts) => {
                self.metrics
                    .ledger
                    .transactions_admitted
                    .inc_by(parts.len() as u64);
                true
            }
            Err(e) => {
                tracing::info!(error = %e, "transaction request rejected");
                self.metrics.ledger.transactions_rejected.inc();
                false
            }
        }
    }

    /// Admits a locally submitted data record and forwards it to peers.
    pub async fn add_data(&self, entry: UserData) -> bool {
        if !self.ledger.lock().await.add_data(entry.clone()) {
            return false;
        }
        self.sync.propagate_data(&entry).await;
        true
    }

    /// Admits a data record forwarded by a peer.
    pub async fn receive_data(&self, entry: UserData) -> bool {
        self.ledger.lock().await.add_data(entry)
    }

    /// Credits the one-time joining fee to `address`.
    pub async fn join(&self, address: &Address) -> bool {
        let granted = self.ledger.lock().await.deposit_joining_fee(address);
        if granted {
            self.metrics.ledger.transactions_admitted.inc();
        }
        granted
    }

    pub async fn balance_of(&self, address: &Address) -> Balance {
        self.ledger.lock().await.balance_of(address)
    }

    /// Every confirmed transaction, in chain order.
    pub async fn all_transactions(&self) -> Vec<Transaction> {
        self.ledger
            .lock()
            .await
            .confirmed_transactions()
            .cloned()
            .collect()
    }

    /// Every confirmed data record, in chain order.
    pub async fn all_data(&self) -> Vec<UserData> {
        self.ledger.lock().await.confirmed_data().cloned().collect()
    }

    pub async fn pending_transactions(&self) -> Vec<Transaction> {
        self.ledger.lock().await.transaction_pool().to_vec()
    }

    pub async fn pending_data(&self) -> Vec<UserData> {
        self.ledger.lock().await.data_pool().to_vec()
    }

    pub fn random_peer(&self) -> Option<String> {
        self.sync.peers().random_peer()
    }

    /// Mines one block now and pushes the new chain to every peer.
    pub async fn mine_now(&self) -> Result<MinedBlock, ConsensusError> {
        let ledger = self.ledger.clone();
        let miner = self.miner.clone();
        let adoptions_pending = self.adoptions_pending.clone();
        let generation = miner.abort_signal().generation();

        let (mined, snapshot) = tokio::task::spawn_blocking(move || {
            let mut guard = ledger.blocking_lock();
            if adoptions_pending.load(Ordering::Acquire) > 0 {
                tracing::debug!("chain adoption pending; not mining");
                return Err(ConsensusError::Aborted);
            }
            let mined = miner.mine_at(&mut guard, generation)?;
            Ok::<_, ConsensusError>((mined, guard.snapshot()))
        })
        .await
        .map_err(|e| ConsensusError::Other(format!("mining task failed: {e}")))?
        .inspect_err(|e| {
            if *e == ConsensusError::Aborted {
                self.metrics.ledger.mining_aborted.inc();
            }
        })?;

        let len = snapshot.chain_len();
        self.committed_len.store(len, Ordering::Release);
        self.metrics.ledger.blocks_mined.inc();
        self.metrics
            .ledger
            .pow_search_seconds
            .observe(mined.elapsed.as_secs_f64());
        self.metrics.ledger.chain_length.set(len as i64);

        self.sync.propagate_chain(&snapshot).await;
        Ok(mined)
    }

    /// Replaces the local chain with `candidate` if it is structurally valid
    /// and strictly longer. Returns whether it was adopted.
    pub async fn accept_chain(&self, candidate: ChainSnapshot) -> bool {
        if let Err(e) = verify_chain(&candidate.chain) {
            tracing::info!(error = %e, "ignoring invalid chain");
            self.metrics.ledger.chains_rejected.inc();
            return false;
        }
        let len = candidate.chain_len();
        if len <= self.committed_len() {
            tracing::debug!(len, local = self.committed_len(), "ignoring chain that is not longer");
            self.metrics.ledger.chains_rejected.inc();
            return false;
        }

        // Stop a proof search over the old tip before waiting for the lock.
        let _pending = PendingAdoption::enter(&self.adoptions_pending);
        self.miner.abort_signal().abort_in_flight();

        let mut ledger = self.ledger.lock().await;
        if len <= ledger.chain_len() || !ledger.replace_with(candidate) {
            self.metrics.ledger.chains_rejected.inc();
            return false;
        }
        self.committed_len.store(len, Ordering::Release);
        drop(ledger);

        tracing::info!(len, "adopted longer peer chain");
        self.metrics.ledger.chains_adopted.inc();
        self.metrics.ledger.chain_length.set(len as i64);
        true
    }

    /// One resync round: top up peers, adopt a longer valid peer chain,
    /// then push the local snapshot to everyone.
    pub async fn resync_once(&self) {
        self.sync.discover_peers().await;
        self.metrics
            .ledger
            .known_peers
            .set(self.sync.peers().len() as i64);

        if let Some(best) = self.sync.find_longest_chain().await {
            self.accept_chain(best).await;
        }

        let snapshot = self.snapshot().await;
        self.sync.propagate_chain(&snapshot).await;
    }

    /// Starts the periodic miner. Returns `false` if it is already running.
    pub fn start_mining(self: &Arc<Self>) -> bool {
        let mut slot = self
            .mining_task
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        let interval = Duration::from_secs(self.miner.config().mining_interval_secs.max(1));
        tracing::info!(interval_secs = interval.as_secs(), "periodic miner started");

        let node = Arc::clone(self);
        let stop = self.stop_tx.subscribe();
        *slot = Some(tokio::spawn(async move {
            node.run_periodic(stop, interval, |node| async move {
                match node.mine_now().await {
                    Ok(_) | Err(ConsensusError::NothingToMine) => {}
                    Err(e) => tracing::warn!(error = %e, "periodic mining failed"),
                }
            })
            .await;
        }));
        true
    }

    /// Starts the periodic resync. Returns `false` if it is already running.
    pub fn start_resync(self: &Arc<Self>) -> bool {
        let mut slot = self
            .resync_task
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        if slot.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }
        let interval = self.sync.config().resync_interval;
        tracing::info!(interval_secs = interval.as_secs(), "periodic resync started");

        let node = Arc::clone(self);
        let stop = self.stop_tx.subscribe();
        *slot = Some(tokio::spawn(async move {
            node.run_periodic(stop, interval, |node| async move {
                node.resync_once().await;
            })
            .await;
        }));
        true
    }

    /// Sleep-after-work loop that exits once the stop signal fires.
    async fn run_periodic<F, Fut>(
        self: Arc<Self>,
        mut stop: watch::Receiver<bool>,
        interval: Duration,
        work: F,
    ) where
        F: Fn(Arc<Self>) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        while !*stop.borrow() {
            work(self.clone()).await;
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = stop.changed() => break,
            }
        }
    }

    /// Stops both background tasks, aborts any proof search and flushes
    /// pending writes.
    pub async fn shutdown(&self) {
        let _ = self.stop_tx.send(true);
        self.miner.abort_signal().abort_in_flight();

        let tasks = [&self.mining_task, &self.resync_task]
            .map(|slot| slot.lock().unwrap_or_else(|p| p.into_inner()).take());
        for task in tasks.into_iter().flatten() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }

        let persistence = self.persistence.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || persistence.flush()).await {
            tracing::warn!(error = %e, "failed to flush persistence writer");
        }
        tracing::info!("node stopped");
    }
}

/// Marks an adoption as pending until dropped, including when the
/// adopting future is cancelled while waiting for the lock.
struct PendingAdoption<'a>(&'a AtomicUsize);

impl<'a> PendingAdoption<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for PendingAdoption<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::consensus::ConsensusConfig;
    use crate::crypto::KeyPair;
    use crate::network::PeerDirectory;
    use crate::network::sync::testing::{FakePeers, FakeRelay};
    use crate::params::JOINING_FEE;
    use crate::storage::{InMemorySnapshotStore, SNAPSHOT_KEY, encode_snapshot};
    use crate::types::{Amount, HASH_LEN, Hash256};

    fn config() -> NodeConfig {
        NodeConfig {
            consensus: ConsensusConfig {
                difficulty: 2,
                mining_interval_secs: 1,
            },
            network: NetworkConfig {
                discovery_attempts: 5,
                resync_interval: Duration::from_millis(50),
                ..NetworkConfig::default()
            },
            ..NodeConfig::default()
        }
    }

    fn chain_of(len: usize) -> ChainSnapshot {
        let mut bc = Blockchain::new(Address::from("peer"), 10111);
        while bc.chain_len() < len {
            let prev = bc.last_block().compute_hash();
            bc.append_block(bc.chain_len() as u64, prev);
        }
        bc.snapshot()
    }

    async fn start_node(
        store: Arc<InMemorySnapshotStore>,
        relay: FakeRelay,
        peers: Arc<FakePeers>,
    ) -> Arc<Node> {
        let cfg = config();
        let sync = ChainSync::new(
            cfg.network.clone(),
            Arc::new(PeerDirectory::new(true)),
            Arc::new(relay),
            peers,
        );
        let metrics = Arc::new(MetricsRegistry::new().expect("metrics"));
        Node::start(cfg, Address::from("miner"), store, sync, metrics)
            .await
            .expect("node should start")
    }

    async fn isolated_node() -> (Arc<Node>, Arc<InMemorySnapshotStore>) {
        let store = Arc::new(InMemorySnapshotStore::new());
        let node = start_node(
            store.clone(),
            FakeRelay::with_answers("10.0.0.1", &[]),
            Arc::new(FakePeers::default()),
        )
        .await;
        (node, store)
    }

    #[tokio::test]
    async fn fresh_node_persists_genesis() {
        let (node, store) = isolated_node().await;
        assert_eq!(node.committed_len(), 1);

        node.shutdown().await;
        let stored = load_snapshot(store.as_ref())
            .expect("load")
            .expect("genesis should be persisted");
        assert_eq!(stored.chain_len(), 1);
        assert_eq!(stored.blockchain_address, Address::from("miner"));
    }

    #[tokio::test]
    async fn startup_adopts_longer_peer_chain() {
        let peers = Arc::new(FakePeers::default());
        peers.serve("10.0.0.2", chain_of(4));
        let relay = FakeRelay::with_answers("10.0.0.1", &["10.0.0.2", "10.0.0.3"]);

        let node = start_node(Arc::new(InMemorySnapshotStore::new()), relay, peers).await;
        let snapshot = node.snapshot().await;
        assert_eq!(snapshot.chain_len(), 4);
        assert_eq!(snapshot.blockchain_address, Address::from("miner"));
        assert_eq!(node.metrics().ledger.chains_adopted.get(), 1);
    }

    #[tokio::test]
    async fn startup_keeps_longer_stored_chain() {
        let store = Arc::new(InMemorySnapshotStore::new());
        let bytes = encode_snapshot(&chain_of(5)).expect("encode");
        store.put(SNAPSHOT_KEY, &bytes).expect("put");

        let peers = Arc::new(FakePeers::default());
        peers.serve("10.0.0.2", chain_of(3));
        let relay = FakeRelay::with_answers("10.0.0.1", &["10.0.0.2"]);

        let node = start_node(store, relay, peers).await;
        assert_eq!(node.committed_len(), 5);
    }

    #[tokio::test]
    async fn unreadable_stored_record_starts_fresh() {
        let store = Arc::new(InMemorySnapshotStore::new());
        store.put(SNAPSHOT_KEY, &[0xFF; 4]).expect("put");
        let node = start_node(
            store,
            FakeRelay::default(),
            Arc::new(FakePeers::default()),
        )
        .await;
        assert_eq!(node.committed_len(), 1);
    }

    #[tokio::test]
    async fn accept_chain_requires_valid_and_strictly_longer() {
        let (node, _) = isolated_node().await;

        assert!(!node.accept_chain(chain_of(1)).await);

        let mut broken = chain_of(6);
        broken.chain[2].previous_hash = Hash256([0x11; HASH_LEN]);
        assert!(!node.accept_chain(broken).await);

        assert!(node.accept_chain(chain_of(3)).await);
        assert_eq!(node.committed_len(), 3);
        assert!(!node.accept_chain(chain_of(3)).await);
        assert_eq!(node.metrics().ledger.chains_rejected.get(), 3);
    }

    #[tokio::test]
    async fn joining_then_mining_credits_fee_and_reward() {
        let peers = Arc::new(FakePeers::default());
        let relay = FakeRelay::with_answers("10.0.0.1", &["10.0.0.2"]);
        let node = start_node(Arc::new(InMemorySnapshotStore::new()), relay, peers.clone()).await;

        let user = Address::from("newcomer");
        assert!(node.join(&user).await);
        assert!(!node.join(&user).await);

        let mined = node.mine_now().await.expect("mine");
        assert_eq!(mined.block.transactions.len(), 2);
        assert_eq!(node.committed_len(), 2);
        assert_eq!(node.balance_of(&user).await, JOINING_FEE.as_balance());
        assert_eq!(node.all_transactions().await.len(), 2);
        assert!(node.pending_transactions().await.is_empty());

        // The new chain was pushed to the one known peer.
        assert_eq!(
            *peers.pushed_chains.lock().unwrap(),
            vec![("10.0.0.2".to_string(), 2)]
        );

        assert_eq!(
            node.mine_now().await.unwrap_err(),
            ConsensusError::NothingToMine
        );
    }

    #[tokio::test]
    async fn local_submissions_are_forwarded_but_peer_ones_are_not() {
        let peers = Arc::new(FakePeers::default());
        let relay = FakeRelay::with_answers("10.0.0.1", &["10.0.0.2"]);
        let node = start_node(Arc::new(InMemorySnapshotStore::new()), relay, peers.clone()).await;

        let alice = KeyPair::generate();
        assert!(node.join(alice.address()).await);
        node.mine_now().await.expect("mine");

        let request = |value: u64| {
            let tx = Transaction::new(alice.address().clone(), Address::from("bob"), Amount(value));
            let sig = alice.sign_transaction(&tx).expect("sign");
            TransactionRequest {
                sender_public_key: Some(alice.public_key().to_hex()),
                sender_chain_address: Some(alice.address().to_string()),
                signature: Some(sig.to_hex()),
                recipient_chain_address: Some("bob".into()),
                value: Some(Amount(value)),
                share: false,
            }
        };

        assert!(node.submit_transaction(request(1)).await);
        assert!(node.receive_transaction(request(2)).await);
        assert!(!node.receive_transaction(request(JOINING_FEE.minor_units() + 1)).await);

        assert_eq!(*peers.pushed_txs.lock().unwrap(), vec!["10.0.0.2".to_string()]);
        assert_eq!(node.pending_transactions().await.len(), 2);
        assert_eq!(node.metrics().ledger.transactions_rejected.get(), 1);

        assert!(node.add_data(UserData::new(Address::from("carol"), vec!["a".into()])).await);
        assert!(node.receive_data(UserData::new(Address::from("dave"), vec![])).await);
        assert_eq!(*peers.pushed_data.lock().unwrap(), vec!["10.0.0.2".to_string()]);
        assert_eq!(node.pending_data().await.len(), 2);
    }

    #[tokio::test]
    async fn adoption_wins_over_mining_queued_on_the_lock() {
        let (node, _) = isolated_node().await;
        assert!(node.join(&Address::from("newcomer")).await);

        let held = node.ledger().lock().await;

        let miner_node = node.clone();
        let mining = tokio::spawn(async move { miner_node.mine_now().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let adopting_node = node.clone();
        let adopting = tokio::spawn(async move { adopting_node.accept_chain(chain_of(2)).await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(held);

        assert_eq!(
            mining.await.expect("mining task").unwrap_err(),
            ConsensusError::Aborted
        );
        assert!(adopting.await.expect("adopting task"));
        assert_eq!(node.committed_len(), 2);
        assert_eq!(node.snapshot().await.chain_len(), 2);
        assert_eq!(node.metrics().ledger.mining_aborted.get(), 1);
        assert_eq!(node.adoptions_pending.load(Ordering::Acquire), 0);

        // The adopted snapshot's pool replaced the local one.
        assert!(node.pending_transactions().await.is_empty());
    }

    #[tokio::test]
    async fn resync_adopts_and_repushes() {
        let peers = Arc::new(FakePeers::default());
        let relay = FakeRelay::with_answers("10.0.0.1", &["10.0.0.2"]);
        let node = start_node(Arc::new(InMemorySnapshotStore::new()), relay, peers.clone()).await;
        assert_eq!(node.committed_len(), 1);

        peers.serve("10.0.0.2", chain_of(6));
        node.resync_once().await;

        assert_eq!(node.committed_len(), 6);
        assert_eq!(
            *peers.pushed_chains.lock().unwrap(),
            vec![("10.0.0.2".to_string(), 6)]
        );
    }

    #[tokio::test]
    async fn background_tasks_start_once_and_stop_on_shutdown() {
        let (node, _) = isolated_node().await;

        assert!(node.start_mining());
        assert!(!node.start_mining());
        assert!(node.start_resync());
        assert!(!node.start_resync());

        tokio::time::sleep(Duration::from_millis(20)).await;
        node.shutdown().await;

        assert!(node.mining_task.lock().unwrap().is_none());
        assert!(node.resync_task.lock().unwrap().is_none());
    }
}
