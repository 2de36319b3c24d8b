//! Credential digests for the identity store.
//!
//! Salted SHA-256: a random per-identity salt is hashed together with the
//! password and stored hex-encoded alongside it. Verification recomputes the
//! digest and compares without short-circuiting.
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct Credential {
    pub salt: String,
    pub digest: String,
}

/// Derive a fresh credential for a new password.
pub fn derive(password: &str) -> Credential {
    let mut salt_bytes = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = hex::encode(salt_bytes);
    let digest = digest_with_salt(&salt, password);
    Credential { salt, digest }
}

/// Check a password attempt against stored credential material.
pub fn verify(salt: &str, digest: &str, password: &str) -> bool {
    let candidate = digest_with_salt(salt, password);
    constant_time_eq(candidate.as_bytes(), digest.as_bytes())
}

fn digest_with_salt(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"|");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

// Compare without early exit so timing does not reveal the match prefix.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (left, right) in a.iter().zip(b.iter()) {
        diff |= left ^ right;
    }
    diff == 0
}
