// chain/src/types/block.rs

//! Block type and canonical hashing.
//!
//! A block hash is SHA-256 over the canonical JSON encoding
//!
//! ```text
//! {"timeStamp":<i64>,"nonce":<u64>,"previousHash":"<hex>","transactions":[..],"data":[..]}
//! ```
//!
//! with the fields in exactly that order. Every node computes hashes the
//! same way, so the encoding is produced from one borrowed view type and is
//! shared by block hashing and the proof-of-work search.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::{Hash256, Transaction, UserData};

/// One link of the chain.
///
/// Blocks are immutable once appended. `timestamp` is the wall-clock commit
/// time in nanoseconds and is *not* covered by the proof of work; see
/// [`crate::consensus::pow`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Commit time, nanoseconds since Unix epoch.
    #[serde(rename = "timeStamp")]
    pub timestamp: i64,

    /// Proof-of-work nonce.
    pub nonce: u64,

    /// Hash of the preceding block.
    pub previous_hash: Hash256,

    /// Confirmed transactions, in admission order.
    pub transactions: Vec<Transaction>,

    /// Confirmed auxiliary data records, in admission order.
    pub data: Vec<UserData>,
}

/// Borrowed view with the canonical field order.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalBlock<'a> {
    #[serde(rename = "timeStamp")]
    timestamp: i64,
    nonce: u64,
    previous_hash: &'a Hash256,
    transactions: &'a [Transaction],
    data: &'a [UserData],
}

/// Hashes block fields without materialising a [`Block`].
///
/// # Panics
///
/// Panics if JSON encoding fails, which cannot happen for these field types.
pub fn hash_parts(
    timestamp: i64,
    nonce: u64,
    previous_hash: &Hash256,
    transactions: &[Transaction],
    data: &[UserData],
) -> Hash256 {
    let view = CanonicalBlock {
        timestamp,
        nonce,
        previous_hash,
        transactions,
        data,
    };
    let bytes = serde_json::to_vec(&view).expect("Block should always be serializable as JSON");
    Hash256::compute(&bytes)
}

impl Block {
    /// Builds a block stamped with the current wall-clock time.
    pub fn new(
        nonce: u64,
        previous_hash: Hash256,
        transactions: Vec<Transaction>,
        data: Vec<UserData>,
    ) -> Self {
        Self {
            timestamp: current_unix_nanos(),
            nonce,
            previous_hash,
            transactions,
            data,
        }
    }

    /// Canonical JSON bytes of this block.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails; all fields are plain strings and integers.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let view = CanonicalBlock {
            timestamp: self.timestamp,
            nonce: self.nonce,
            previous_hash: &self.previous_hash,
            transactions: &self.transactions,
            data: &self.data,
        };
        serde_json::to_vec(&view).expect("Block should always be serializable as JSON")
    }

    /// Canonical SHA-256 hash of this block.
    pub fn compute_hash(&self) -> Hash256 {
        hash_parts(
            self.timestamp,
            self.nonce,
            &self.previous_hash,
            &self.transactions,
            &self.data,
        )
    }
}

/// Current wall-clock time in nanoseconds since Unix epoch.
///
/// Falls back to 0 if the system clock is before the epoch.
pub fn current_unix_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Address, Amount, HASH_LEN};

    fn sample_block() -> Block {
        Block {
            timestamp: 1_700_000_000_000_000_000,
            nonce: 42,
            previous_hash: Hash256([1u8; HASH_LEN]),
            transactions: vec![Transaction::new(
                Address::from("alice"),
                Address::from("bob"),
                Amount(5),
            )],
            data: vec![UserData::new(Address::from("carol"), vec!["payload".into()])],
        }
    }

    #[test]
    fn block_hash_is_deterministic() {
        let block = sample_block();
        assert_eq!(block.compute_hash(), block.compute_hash());
    }

    #[test]
    fn canonical_encoding_has_fixed_field_order() {
        let block = Block {
            previous_hash: Hash256::ZERO,
            ..Block::default()
        };
        let json = String::from_utf8(block.canonical_bytes()).unwrap();
        let expected = format!(
            r#"{{"timeStamp":0,"nonce":0,"previousHash":"{}","transactions":[],"data":[]}}"#,
            "00".repeat(HASH_LEN)
        );
        assert_eq!(json, expected);
    }

    #[test]
    fn serde_roundtrip_preserves_hash() {
        let block = sample_block();
        let json = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.compute_hash(), block.compute_hash());
    }

    #[test]
    fn hash_is_order_sensitive() {
        let mut block = sample_block();
        block.transactions.push(Transaction::new(
            Address::from("dave"),
            Address::from("erin"),
            Amount(9),
        ));
        let before = block.compute_hash();
        block.transactions.reverse();
        assert_ne!(before, block.compute_hash());
    }

    #[test]
    fn hash_parts_matches_block_hash() {
        let block = sample_block();
        let h = hash_parts(
            block.timestamp,
            block.nonce,
            &block.previous_hash,
            &block.transactions,
            &block.data,
        );
        assert_eq!(h, block.compute_hash());
    }

    #[test]
    fn decode_rejects_short_previous_hash() {
        let json = r#"{"timeStamp":0,"nonce":0,"previousHash":"abcd","transactions":[],"data":[]}"#;
        assert!(serde_json::from_str::<Block>(json).is_err());
    }
}
