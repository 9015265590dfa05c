//! The authoritative in-memory ledger.
//!
//! A [`Blockchain`] owns the confirmed chain plus the two pending pools.
//! All mutation goes through `&mut self`, so callers serialise access with
//! whatever lock wraps the single ledger instance (see [`crate::node`]).

use std::collections::HashSet;

use crate::storage::PersistenceHandle;
use crate::types::{Address, Balance, Block, Hash256, Transaction, UserData};

use super::snapshot::ChainSnapshot;

pub struct Blockchain {
    chain: Vec<Block>,
    transaction_pool: Vec<Transaction>,
    data_pool: Vec<UserData>,
    address: Address,
    port: u16,
    persistence: Option<PersistenceHandle>,
}

impl Blockchain {
    /// Fresh ledger holding only the genesis block.
    pub fn new(address: Address, port: u16) -> Self {
        let mut bc = Self {
            chain: Vec::new(),
            transaction_pool: Vec::new(),
            data_pool: Vec::new(),
            address,
            port,
            persistence: None,
        };
        bc.append_block(0, Self::genesis_previous_hash());
        bc
    }

    /// Restores a ledger from a snapshot, keeping the given node identity.
    ///
    /// An empty snapshot chain is replaced by a fresh genesis block so the
    /// chain is never empty.
    pub fn from_snapshot(snapshot: ChainSnapshot, address: Address, port: u16) -> Self {
        if snapshot.chain.is_empty() {
            return Self::new(address, port);
        }
        Self {
            chain: snapshot.chain,
            transaction_pool: snapshot.transaction_pool,
            data_pool: snapshot.data_pool,
            address,
            port,
            persistence: None,
        }
    }

    /// Attaches the persistence writer; every later mutation is saved.
    pub fn with_persistence(mut self, handle: PersistenceHandle) -> Self {
        self.persistence = Some(handle);
        self
    }

    /// Previous-hash of the genesis block: the hash of the zero block.
    pub fn genesis_previous_hash() -> Hash256 {
        Block::default().compute_hash()
    }

    /// Moves both pools into a new block and appends it.
    pub fn append_block(&mut self, nonce: u64, previous_hash: Hash256) -> &Block {
        let transactions = std::mem::take(&mut self.transaction_pool);
        let data = std::mem::take(&mut self.data_pool);
        self.chain
            .push(Block::new(nonce, previous_hash, transactions, data));
        self.persist();
        self.last_block()
    }

    /// The most recent block.
    pub fn last_block(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn transaction_pool(&self) -> &[Transaction] {
        &self.transaction_pool
    }

    pub fn data_pool(&self) -> &[UserData] {
        &self.data_pool
    }

    /// Reward address of this node.
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Balance of `address` over confirmed blocks only.
    ///
    /// Pending pool entries are ignored.
    pub fn balance_of(&self, address: &Address) -> Balance {
        let mut total: Balance = 0;
        for tx in self.confirmed_transactions() {
            if &tx.recipient == address {
                total += tx.value.as_balance();
            }
            if &tx.sender == address {
                total -= tx.value.as_balance();
            }
        }
        total
    }

    /// All confirmed transactions in chain order.
    pub fn confirmed_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.chain.iter().flat_map(|b| b.transactions.iter())
    }

    /// All confirmed data records in chain order.
    pub fn confirmed_data(&self) -> impl Iterator<Item = &UserData> {
        self.chain.iter().flat_map(|b| b.data.iter())
    }

    /// Distinct confirmed data owners in first-appearance order.
    pub fn data_contributors(&self, exclude: &Address) -> Vec<Address> {
        let mut seen = HashSet::new();
        self.confirmed_data()
            .map(|d| &d.owner)
            .filter(|owner| *owner != exclude && !owner.is_empty())
            .filter(|owner| seen.insert((*owner).clone()))
            .cloned()
            .collect()
    }

    /// Whether an identical transaction is already confirmed.
    pub fn has_confirmed(&self, tx: &Transaction) -> bool {
        self.confirmed_transactions().any(|t| t == tx)
    }

    /// Whether an identical transaction is waiting in the pool.
    pub fn has_pending(&self, tx: &Transaction) -> bool {
        self.transaction_pool.iter().any(|t| t == tx)
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot {
            chain: self.chain.clone(),
            transaction_pool: self.transaction_pool.clone(),
            data_pool: self.data_pool.clone(),
            blockchain_address: self.address.clone(),
            port: self.port,
        }
    }

    /// Replaces chain and pools wholesale with a peer's snapshot.
    ///
    /// The node's own address and port are kept. Empty snapshots are
    /// ignored.
    pub fn replace_with(&mut self, snapshot: ChainSnapshot) -> bool {
        if snapshot.chain.is_empty() {
            return false;
        }
        self.chain = snapshot.chain;
        self.transaction_pool = snapshot.transaction_pool;
        self.data_pool = snapshot.data_pool;
        self.persist();
        true
    }

    /// Hands the current state to the persistence writer, if attached.
    pub fn persist(&self) {
        if let Some(handle) = &self.persistence {
            handle.save(&self.snapshot());
        }
    }

    pub(crate) fn push_pending_transaction(&mut self, tx: Transaction) {
        self.transaction_pool.push(tx);
    }

    pub(crate) fn push_pending_transactions(&mut self, txs: impl IntoIterator<Item = Transaction>) {
        self.transaction_pool.extend(txs);
    }

    pub(crate) fn push_pending_data(&mut self, entry: UserData) {
        self.data_pool.push(entry);
    }
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("len", &self.chain.len())
            .field("pending_txs", &self.transaction_pool.len())
            .field("pending_data", &self.data_pool.len())
            .field("address", &self.address)
            .field("port", &self.port)
            .finish()
    }
}
