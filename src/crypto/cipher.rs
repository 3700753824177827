//! Datagram encryption.
//!
//! Wire layout of every encrypted datagram:
//!
//! ```text
//! +------------------+--------------------------------------+
//! | Nonce            | ChaCha20(key, nonce, ctr=0) ^ frame  |
//! | 8 bytes (random) | len(frame) bytes                     |
//! +------------------+--------------------------------------+
//! ```
//!
//! The block counter restarts at zero for every datagram and only the random
//! nonce varies. There is no authentication tag and no replay protection:
//! a tampered datagram decrypts to garbage that the frame parser then drops.
//! This matches the deployed servers and cannot change without breaking the
//! wire format.

use crate::core::{ByteBuffer, CryptoError, NONCE_SIZE};

use super::chacha20::ChaCha20;
use super::keys::{generate_nonce, SessionKey};

/// Encrypts and decrypts whole datagrams under a fixed key.
#[derive(Debug, Clone)]
pub struct CipherBox {
    key: SessionKey,
}

impl CipherBox {
    /// Create a cipher box whose key is derived from `secret`.
    pub fn new(secret: &str) -> Self {
        Self::with_key(SessionKey::derive(secret))
    }

    /// Create a cipher box from an existing key.
    pub fn with_key(key: SessionKey) -> Self {
        Self { key }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> ByteBuffer {
        let mut buf = ByteBuffer::from(plaintext);
        self.encrypt_in_place(&mut buf);
        buf
    }

    /// Decrypt `nonce || ciphertext`, returning the plaintext.
    pub fn decrypt(&self, input: &[u8]) -> Result<ByteBuffer, CryptoError> {
        let mut buf = ByteBuffer::from(input);
        self.decrypt_in_place(&mut buf)?;
        Ok(buf)
    }

    /// Encrypt the buffer contents and prepend a fresh nonce.
    pub fn encrypt_in_place(&self, buf: &mut ByteBuffer) {
        self.encrypt_with_nonce(buf, &generate_nonce());
    }

    /// Strip the nonce and decrypt the remainder in place.
    ///
    /// Leaves the buffer untouched on error.
    pub fn decrypt_in_place(&self, buf: &mut ByteBuffer) -> Result<(), CryptoError> {
        if buf.len() < NONCE_SIZE {
            return Err(CryptoError::CiphertextTooShort {
                len: buf.len(),
                min: NONCE_SIZE,
            });
        }
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&buf[..NONCE_SIZE]);
        buf.remove_front(NONCE_SIZE);
        ChaCha20::new(self.key.as_bytes(), &nonce, 0).apply_keystream(buf.as_mut_slice());
        Ok(())
    }

    fn encrypt_with_nonce(&self, buf: &mut ByteBuffer, nonce: &[u8; NONCE_SIZE]) {
        ChaCha20::new(self.key.as_bytes(), nonce, 0).apply_keystream(buf.as_mut_slice());
        buf.insert_front(nonce);
    }
}
