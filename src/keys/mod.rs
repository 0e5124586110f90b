//! Admin key generation and hashing.
//!
//! The catalog server stores only the SHA-256 hex digest of the admin key
//! (`ADMIN_SECRET_HASH`); operators keep the key itself in `ADMIN_KEY`.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngExt;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Random bytes in a generated key (256 bits).
pub const ADMIN_KEY_BYTES: usize = 32;

/// A freshly generated admin key with the digest the server stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminKeyPair {
    pub admin_key: String,
    pub admin_hash: String,
}

/// Generates a URL-safe admin key from 32 random bytes.
pub fn generate_admin_key() -> String {
    let bytes: [u8; ADMIN_KEY_BYTES] = rand::rng().random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hex-encoded SHA-256 of the key, as the server stores it.
pub fn hash_admin_key(admin_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(admin_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a key and its digest.
pub fn generate_key_pair() -> AdminKeyPair {
    let admin_key = generate_admin_key();
    let admin_hash = hash_admin_key(&admin_key);
    AdminKeyPair {
        admin_key,
        admin_hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = generate_admin_key();
        // 32 bytes, unpadded base64
        assert_eq!(key.len(), 43);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(generate_admin_key(), generate_admin_key());
    }

    #[test]
    fn test_hash_is_sha256_hex() {
        assert_eq!(
            hash_admin_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_pair_hash_matches_key() {
        let pair = generate_key_pair();
        assert_eq!(pair.admin_hash, hash_admin_key(&pair.admin_key));
        assert_eq!(pair.admin_hash.len(), 64);
        assert_ne!(pair.admin_hash, hash_admin_key("wrong"));
    }
}
