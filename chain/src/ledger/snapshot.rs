use serde::{Deserialize, Serialize};

use crate::types::{Address, Block, Transaction, UserData};

/// Full copy of a node's ledger state.
///
/// This is both the peer wire payload (`GET /`, `POST /sync`) and the
/// persisted record. `blockchainAddress` and `port` describe the node that
/// produced the snapshot; a node adopting a peer snapshot keeps its own.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    #[serde(default)]
    pub transaction_pool: Vec<Transaction>,
    #[serde(default)]
    pub data_pool: Vec<UserData>,
    #[serde(default)]
    pub blockchain_address: Address,
    #[serde(default)]
    pub port: u16,
}

impl ChainSnapshot {
    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}
