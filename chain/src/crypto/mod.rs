//! Cryptographic identity: key pairs, address derivation, transaction
//! signing and verification (ECDSA over NIST P-256).

pub mod address;
pub mod error;
pub mod keys;

pub use address::{derive_address, is_valid_address};
pub use error::{CryptoError, CryptoResult};
pub use keys::{KeyPair, PublicKey, Signature, verify_transaction};
