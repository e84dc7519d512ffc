//! API key generation and hashing.
//!
//! Keys are shown to the user once; only the SHA-256 digest is stored.

use rand::distr::{Alphanumeric, Distribution};
use sha2::{Digest, Sha256};

/// API key prefix.
const KEY_PREFIX: &str = "sv_";
/// Length of random part of the key.
const KEY_RANDOM_LENGTH: usize = 32;
/// Characters of the key that are safe to log.
pub const KEY_LOG_PREFIX_LENGTH: usize = 8;

/// Generate a new random API key.
pub fn generate_key() -> String {
    let random_part: String = Alphanumeric
        .sample_iter(rand::rng())
        .take(KEY_RANDOM_LENGTH)
        .map(char::from)
        .collect();

    format!("{}{}", KEY_PREFIX, random_part)
}

/// Hash an API key using SHA-256.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Leading characters of a key, for log lines.
pub fn log_prefix(key: &str) -> String {
    key.chars().take(KEY_LOG_PREFIX_LENGTH).collect()
}
