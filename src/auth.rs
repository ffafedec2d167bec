//! Password hashing for embedding front-ends
//!
//! Stored form is `salt:digest` where both halves are lowercase hex and
//! the digest is SHA-256 over `salt || password`. Verification recomputes
//! the digest and compares in constant time.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Salt length in bytes (32 hex chars in the stored form)
const SALT_LEN: usize = 16;

/// Hash `password` with a fresh random salt, returning `salt:digest`
pub fn hash_password(password: &str) -> String {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex(&salt_bytes);
    let digest = digest_with_salt(&salt, password);
    format!("{salt}:{digest}")
}

/// Check `password` against a stored `salt:digest` string.
///
/// Malformed stored values verify as false rather than erroring.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once(':') else {
        return false;
    };
    let actual = digest_with_salt(salt, password);
    constant_time_eq(actual.as_bytes(), expected.as_bytes())
}

fn digest_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Constant-time byte comparison to prevent timing side-channel attacks.
/// Always compares all bytes regardless of where the first mismatch occurs.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
