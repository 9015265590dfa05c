// chain/src/types/tx.rs

//! Transaction and auxiliary data payloads.
//!
//! Both types appear in blocks, in the pending pools and on the wire. Their
//! JSON field names and order are part of the canonical block encoding, so
//! they must not be renamed or reordered.

use serde::{Deserialize, Serialize};

use super::{Address, Amount, Hash256};

/// Value transfer between two chain addresses.
///
/// No signature is stored: signatures are checked once at admission time
/// and an admitted transaction is trusted as-is afterwards.
///
/// Fields are declared in sorted key order so the canonical JSON form is
/// `{"recipientChainAddress":..,"senderChainAddress":..,"value":..}`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    /// Address credited with `value`.
    #[serde(rename = "recipientChainAddress")]
    pub recipient: Address,

    /// Address debited with `value`.
    #[serde(rename = "senderChainAddress")]
    pub sender: Address,

    /// Transferred amount in minor units.
    pub value: Amount,
}

impl Transaction {
    pub fn new(sender: Address, recipient: Address, value: Amount) -> Self {
        Self {
            recipient,
            sender,
            value,
        }
    }

    /// Credit issued by the system identity (mining reward, joining fee).
    pub fn system_credit(recipient: Address, value: Amount) -> Self {
        Self::new(Address::system(), recipient, value)
    }

    /// Whether this transaction is sent by the reserved system identity.
    pub fn is_system(&self) -> bool {
        self.sender.is_system()
    }

    /// Canonical JSON bytes of this transaction.
    ///
    /// # Panics
    ///
    /// Panics if encoding fails, which cannot happen for plain strings and
    /// integers.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("Transaction should always be serializable as JSON")
    }

    /// Digest that senders sign and verifiers recompute.
    pub fn signing_hash(&self) -> Hash256 {
        Hash256::compute(&self.canonical_bytes())
    }
}

/// Auxiliary data record: an owner address and opaque string payloads.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    /// Address of the contributor.
    #[serde(rename = "blockchainAddress")]
    pub owner: Address,

    /// Opaque payloads, in submission order.
    pub data: Vec<String>,
}

impl UserData {
    pub fn new(owner: Address, data: Vec<String>) -> Self {
        Self { owner, data }
    }
}
