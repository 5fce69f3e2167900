//! Content hashing.
//!
//! Object identity is the SHA-256 digest of the object's serialized bytes,
//! hex-encoded and truncated to [`HASH_LEN`] characters. The same bytes
//! always hash to the same identifier; collisions are out of threat model.

use sha2::{Digest, Sha256};

/// Length of an object hash in hex characters.
pub const HASH_LEN: usize = 16;

/// Compute the content hash of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex.truncate(HASH_LEN);
    hex
}

/// Compute the content hash of a string.
pub fn hash_str(s: &str) -> String {
    hash_bytes(s.as_bytes())
}
