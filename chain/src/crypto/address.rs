//! Chain address derivation.
//!
//! An address is Base58Check over `version || RIPEMD-160(SHA-256(pk))`,
//! where `pk` is the 64-byte `X || Y` encoding of the public key and the
//! checksum is the first four bytes of a double SHA-256 of the payload.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::types::Address;

/// Version byte prefixed to every address payload.
pub const ADDRESS_VERSION: u8 = 0x00;

/// Length of the trailing checksum.
pub const ADDRESS_CHECKSUM_LEN: usize = 4;

const PUBKEY_HASH_LEN: usize = 20;

/// Derives the chain address for a public key.
///
/// The caller must pass the canonical `X || Y` encoding; other encodings
/// of the same key yield different addresses.
pub fn derive_address(public_key_bytes: &[u8]) -> Address {
    let sha = Sha256::digest(public_key_bytes);
    let pubkey_hash = Ripemd160::digest(sha);

    let mut payload = Vec::with_capacity(1 + PUBKEY_HASH_LEN + ADDRESS_CHECKSUM_LEN);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(&pubkey_hash);

    let checksum = checksum(&payload);
    payload.extend_from_slice(&checksum);

    Address::new(bs58::encode(payload).into_string())
}

/// Checks the Base58Check structure of an address string.
pub fn is_valid_address(address: &str) -> bool {
    let Ok(decoded) = bs58::decode(address).into_vec() else {
        return false;
    };
    if decoded.len() != 1 + PUBKEY_HASH_LEN + ADDRESS_CHECKSUM_LEN || decoded[0] != ADDRESS_VERSION
    {
        return false;
    }
    let (payload, actual) = decoded.split_at(decoded.len() - ADDRESS_CHECKSUM_LEN);
    checksum(payload) == actual
}

fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECKSUM_LEN] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; ADDRESS_CHECKSUM_LEN];
    out.copy_from_slice(&second[..ADDRESS_CHECKSUM_LEN]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_and_valid() {
        let pk = [7u8; 64];
        let a1 = derive_address(&pk);
        let a2 = derive_address(&pk);
        assert_eq!(a1, a2);
        assert!(is_valid_address(a1.as_str()));
        assert!(a1.as_str().starts_with('1'));
    }

    #[test]
    fn different_keys_give_different_addresses() {
        assert_ne!(derive_address(&[1u8; 64]), derive_address(&[2u8; 64]));
    }

    #[test]
    fn corrupted_address_fails_checksum() {
        let addr = derive_address(&[9u8; 64]);
        let mut chars: Vec<char> = addr.as_str().chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '2' { '3' } else { '2' };
        let corrupted: String = chars.into_iter().collect();
        assert!(!is_valid_address(&corrupted));
        assert!(!is_valid_address("PRISM CHAIN"));
    }
}
