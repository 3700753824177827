//! Key and identification derivation.
//!
//! Both values are SHA-256 digests of user-supplied strings: the shared
//! secret yields the stream cipher key, the username yields the 32-byte
//! identification carried in client frames.

use crate::core::{IDENTIFICATION_SIZE, KEY_SIZE, NONCE_SIZE};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// The 256-bit symmetric key shared with the server.
///
/// Zeroized on drop.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; KEY_SIZE],
}

impl SessionKey {
    /// Derive the key from the shared secret.
    pub fn derive(secret: &str) -> Self {
        Self {
            key: sha256_ascii(secret),
        }
    }

    /// Create a session key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([redacted])")
    }
}

/// Derive the 32-byte client identification from a username.
pub fn derive_identification(username: &str) -> [u8; IDENTIFICATION_SIZE] {
    sha256_ascii(username)
}

/// Generate a fresh random nonce from the OS RNG.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// SHA-256 over the ASCII encoding of `s`; non-ASCII characters hash as `?`.
fn sha256_ascii(s: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for c in s.chars() {
        let byte = if c.is_ascii() { c as u8 } else { b'?' };
        hasher.update([byte]);
    }
    hasher.finalize().into()
}
