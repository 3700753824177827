//! Outernet Protocol - Crypto Layer
//!
//! Symmetric encryption for tunnel datagrams:
//!
//! - [`ChaCha20`]: keystream generator (64-bit nonce, 64-bit counter)
//! - [`SessionKey`]: SHA-256 of the shared secret, zeroized on drop
//! - [`CipherBox`]: `nonce || keystream ^ frame` datagram sealing
//!
//! There is no key exchange: both ends derive the same key from a
//! pre-shared secret.

mod chacha20;
mod cipher;
mod keys;

pub use chacha20::ChaCha20;
pub use cipher::CipherBox;
pub use keys::{derive_identification, generate_nonce, SessionKey};
