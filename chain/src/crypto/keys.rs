//! ECDSA P-256 key pairs, public keys and signatures.
//!
//! Hex encodings used on the wire:
//!
//! - private key: 32-byte scalar (64 hex chars),
//! - public key:  `X || Y` affine coordinates (128 hex chars),
//! - signature:   `R || S` (128 hex chars).
//!
//! Transactions are signed over [`Transaction::signing_hash`], i.e. the
//! message is pre-hashed with SHA-256 and the digest is signed directly.

use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand_core::OsRng;

use super::address::derive_address;
use super::error::{CryptoError, CryptoResult};
use crate::types::{Address, Transaction};

pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 64;
pub const SIGNATURE_LEN: usize = 64;

const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Verifying half of a key pair.
#[derive(Clone, Debug)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parses the 128-char hex `X || Y` encoding.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim())?;
        Self::from_bytes(&bytes)
    }

    /// Parses the raw 64-byte `X || Y` encoding.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut sec1 = Vec::with_capacity(1 + PUBLIC_KEY_LEN);
        sec1.push(SEC1_UNCOMPRESSED_TAG);
        sec1.extend_from_slice(bytes);
        VerifyingKey::from_sec1_bytes(&sec1)
            .map(PublicKey)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Raw `X || Y` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let point = self.0.to_encoded_point(false);
        point.as_bytes()[1..].to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Chain address owned by this key.
    pub fn address(&self) -> Address {
        derive_address(&self.to_bytes())
    }

    /// Checks `signature` over the canonical hash of `tx`.
    pub fn verify_transaction(&self, tx: &Transaction, signature: &Signature) -> CryptoResult<()> {
        let digest = tx.signing_hash();
        self.0
            .verify_prehash(digest.as_bytes(), &signature.0)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

/// Detached `R || S` signature.
#[derive(Clone, Debug)]
pub struct Signature(EcdsaSignature);

impl Signature {
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim())?;
        if bytes.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignatureLength {
                expected: SIGNATURE_LEN,
                actual: bytes.len(),
            });
        }
        EcdsaSignature::from_slice(&bytes)
            .map(Signature)
            .map_err(|_| CryptoError::MalformedSignature)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_bytes())
    }
}

/// Private/public key pair plus the derived address.
pub struct KeyPair {
    signing: SigningKey,
    public: PublicKey,
    address: Address,
}

impl KeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    /// Restores a key pair from the 64-char hex private scalar.
    pub fn from_private_hex(s: &str) -> CryptoResult<Self> {
        let bytes = hex::decode(s.trim())?;
        if bytes.len() != PRIVATE_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: PRIVATE_KEY_LEN,
                actual: bytes.len(),
            });
        }
        let signing = SigningKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_signing_key(signing))
    }

    fn from_signing_key(signing: SigningKey) -> Self {
        let public = PublicKey(*signing.verifying_key());
        let address = public.address();
        Self {
            signing,
            public,
            address,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }

    /// Signs the canonical hash of `tx`.
    pub fn sign_transaction(&self, tx: &Transaction) -> CryptoResult<Signature> {
        let digest = tx.signing_hash();
        let signature: EcdsaSignature = self
            .signing
            .sign_prehash(digest.as_bytes())
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
        Ok(Signature(signature))
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Verifies a transaction signature; any failure is a rejection.
pub fn verify_transaction(public_key: &PublicKey, signature: &Signature, tx: &Transaction) -> bool {
    public_key.verify_transaction(tx, signature).is_ok()
}
