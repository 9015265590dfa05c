//! Core domain types used by the ledger.
//!
//! This module defines the strongly-typed digest, address and amount
//! newtypes shared across the node, plus the block and transaction payloads
//! in the submodules. The goal is to avoid "naked" byte buffers, strings and
//! numbers in public APIs and instead use domain-specific newtypes with an
//! explicit wire form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::params::SYSTEM_SENDER;

/// Blocks and block hashing.
pub mod block;
/// Transactions and auxiliary data records.
pub mod tx;

pub use block::Block;
pub use tx::{Transaction, UserData};

/// Length in bytes of all 256-bit digests used in this module.
pub const HASH_LEN: usize = 32;

/// Minor units per whole coin.
pub const MINOR_UNITS_PER_COIN: u64 = 1_000_000;

/// Error returned when a hex-encoded digest cannot be decoded.
#[derive(Debug, Error, PartialEq)]
pub enum HashDecodeError {
    #[error("invalid hex digest: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid digest length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Strongly-typed 256-bit SHA-256 digest.
///
/// On the wire (JSON and the persisted record) a `Hash256` is always a
/// lowercase hex string of exactly `2 * HASH_LEN` characters. Decoding is
/// strict: anything that is not hex, or that decodes to a length other than
/// [`HASH_LEN`], is rejected.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// The all-zero digest.
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Computes the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    /// Returns the underlying 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lowercase hex form, as used on the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decodes a hex string into a digest, rejecting anything that is not
    /// exactly [`HASH_LEN`] bytes.
    pub fn from_hex(s: &str) -> Result<Self, HashDecodeError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != HASH_LEN {
            return Err(HashDecodeError::InvalidLength {
                expected: HASH_LEN,
                actual: bytes.len(),
            });
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&bytes);
        Ok(Hash256(out))
    }

    /// Number of leading zero hex digits (nibbles) in the digest.
    ///
    /// This is the quantity proof-of-work difficulty is measured in.
    pub fn leading_zero_nibbles(&self) -> usize {
        let mut count = 0;
        for byte in self.0 {
            if byte == 0 {
                count += 2;
                continue;
            }
            if byte >> 4 == 0 {
                count += 1;
            }
            break;
        }
        count
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Hash256 {
    type Err = HashDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hash256::from_hex(s)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash256::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Chain address: a stable pseudonymous identifier.
///
/// Regular addresses are derived from a public key (see
/// [`crate::crypto::derive_address`]). The reserved [`SYSTEM_SENDER`]
/// identity is also an `Address`, but no key pair can produce it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Address(value.into())
    }

    /// The reserved system identity used for rewards and joining credits.
    pub fn system() -> Self {
        Address(SYSTEM_SENDER.to_string())
    }

    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_SENDER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Address(value.to_string())
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Address(value)
    }
}

/// Non-negative monetary amount in minor units.
///
/// Values travel as JSON integers. Negative, fractional or non-finite
/// numbers fail to deserialize, so no lossy floating-point value ever
/// reaches the ledger.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(pub u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// Amount worth `whole` coins.
    pub const fn coins(whole: u64) -> Self {
        Amount(whole * MINOR_UNITS_PER_COIN)
    }

    pub const fn from_minor(units: u64) -> Self {
        Amount(units)
    }

    pub const fn minor_units(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// `pct` percent of this amount, rounded down.
    pub fn percent(self, pct: u64) -> Amount {
        let share = u128::from(self.0) * u128::from(pct) / 100;
        Amount(u64::try_from(share).unwrap_or(u64::MAX))
    }

    /// Splits the amount into `parts` equal shares.
    ///
    /// Returns `(share, remainder)`; `parts == 0` yields a zero share and the
    /// whole amount as remainder.
    pub fn split_evenly(self, parts: usize) -> (Amount, Amount) {
        let Ok(parts) = u64::try_from(parts) else {
            return (Amount::ZERO, self);
        };
        if parts == 0 {
            return (Amount::ZERO, self);
        }
        (Amount(self.0 / parts), Amount(self.0 % parts))
    }

    /// Signed view of the amount, for balance arithmetic.
    pub fn as_balance(self) -> Balance {
        Balance::from(self.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / MINOR_UNITS_PER_COIN,
            self.0 % MINOR_UNITS_PER_COIN
        )
    }
}

/// Signed balance in minor units.
///
/// Balances can go negative for the system identity, which only ever sends.
pub type Balance = i128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_hex_roundtrip_is_lowercase() {
        let h = Hash256([0xAB; HASH_LEN]);
        let hex = h.to_hex();
        assert_eq!(hex.len(), HASH_LEN * 2);
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(Hash256::from_hex(&hex).unwrap(), h);
    }

    #[test]
    fn hash_decode_rejects_wrong_length_and_non_hex() {
        let short = "ab".repeat(31);
        assert_eq!(
            Hash256::from_hex(&short),
            Err(HashDecodeError::InvalidLength {
                expected: HASH_LEN,
                actual: 31
            })
        );

        let not_hex = "zz".repeat(32);
        assert!(matches!(
            Hash256::from_hex(&not_hex),
            Err(HashDecodeError::InvalidHex(_))
        ));
    }

    #[test]
    fn hash_json_form_is_a_hex_string() {
        let h = Hash256([0x01; HASH_LEN]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(32)));

        let bad = format!("\"{}\"", "01".repeat(33));
        assert!(serde_json::from_str::<Hash256>(&bad).is_err());
    }

    #[test]
    fn leading_zero_nibbles_counts_hex_digits() {
        let mut bytes = [0xFFu8; HASH_LEN];
        assert_eq!(Hash256(bytes).leading_zero_nibbles(), 0);

        bytes[0] = 0x0F;
        assert_eq!(Hash256(bytes).leading_zero_nibbles(), 1);

        bytes[0] = 0x00;
        bytes[1] = 0x0A;
        assert_eq!(Hash256(bytes).leading_zero_nibbles(), 3);

        assert_eq!(Hash256::ZERO.leading_zero_nibbles(), HASH_LEN * 2);
    }

    #[test]
    fn amount_rejects_negative_and_fractional_json() {
        assert!(serde_json::from_str::<Amount>("-5").is_err());
        assert!(serde_json::from_str::<Amount>("1.5").is_err());
        assert_eq!(serde_json::from_str::<Amount>("42").unwrap(), Amount(42));
    }

    #[test]
    fn amount_percent_and_split() {
        let value = Amount::coins(100);
        assert_eq!(value.percent(5), Amount::coins(5));

        let (share, rem) = Amount(10).split_evenly(3);
        assert_eq!(share, Amount(3));
        assert_eq!(rem, Amount(1));

        let (share, rem) = Amount(10).split_evenly(0);
        assert_eq!(share, Amount::ZERO);
        assert_eq!(rem, Amount(10));
    }

    #[test]
    fn amount_displays_in_coins() {
        assert_eq!(Amount::coins(50).to_string(), "50.000000");
        assert_eq!(Amount(1_500_000).to_string(), "1.500000");
    }

    #[test]
    fn system_address_is_recognised() {
        assert!(Address::system().is_system());
        assert!(!Address::from("1abc").is_system());
        assert!(Address::from("  ").is_empty());
    }
}
