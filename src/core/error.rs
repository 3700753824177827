//! Error types shared across the Outernet layers.

use thiserror::Error;

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input is shorter than the nonce that must prefix it.
    #[error("ciphertext too short: {len} bytes, need at least {min}")]
    CiphertextTooShort {
        /// Bytes received.
        len: usize,
        /// Minimum accepted length (the nonce size).
        min: usize,
    },
}

/// Errors reported by a virtual network device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device ring is full; the packet was not written.
    #[error("device ring buffer full")]
    Overflow,

    /// No data session is open on the device.
    #[error("device session not started")]
    NotReady,

    /// Driver-level failure.
    #[error("device failure: {0}")]
    Failed(String),
}

/// Errors reported by the OS network configurator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// Operation requires a configured network.
    #[error("network not initialized")]
    NotInitialized,

    /// Network already configured by this configurator.
    #[error("network already initialized")]
    AlreadyInitialized,

    /// A configuration command failed.
    #[error("network command failed: {0}")]
    CommandFailed(String),
}

/// Top-level Outernet errors. Every layer error converts into it with `?`.
#[derive(Debug, Error)]
pub enum OuternetError {
    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Device error.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Network configuration error.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// Session error.
    #[cfg(feature = "client")]
    #[error("session error: {0}")]
    Client(#[from] crate::client::ClientError),

    /// Connection lifecycle error.
    #[cfg(feature = "control")]
    #[error("control error: {0}")]
    Control(#[from] crate::control::ControlError),

    /// I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
