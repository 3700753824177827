//! # Outernet
//!
//! Client side of a point-to-point encrypted UDP tunnel.
//!
//! A client identifies itself with the SHA-256 of its username, encrypts
//! every datagram with ChaCha20 under the SHA-256 of a pre-shared secret,
//! handshakes to learn its tunnel addresses and then relays raw IPv4 packets
//! between a TUN device and the server.
//!
//! ## Feature Flags
//!
//! - `transport` (default): Frame codec and UDP socket
//! - `crypto` (default): ChaCha20 keystream, key derivation, cipher box
//! - `client` (default): Tunnel session (handshake + packet relay)
//! - `control` (default): Connection lifecycle controller
//!
//! ## Modules
//!
//! - [`core`]: Byte buffer, collaborator traits, constants and errors (always included)
//! - [`crypto`]: Security layer (requires `crypto` feature)
//! - [`transport`]: Wire layer (requires `transport` feature)
//! - [`client`]: Session layer (requires `client` feature)
//! - [`control`]: Lifecycle layer (requires `control` feature)
//!
//! ## Example Usage
//!
//! ```rust
//! use outernet::prelude::*;
//!
//! let cipher = CipherBox::new("pre-shared secret");
//! let frame = Header::ClientHandshake {
//!     identification: Identification::from_bytes(derive_identification("alice")),
//! }
//! .to_bytes();
//!
//! let sealed = cipher.encrypt(&frame);
//! assert_eq!(sealed.len(), NONCE_SIZE + frame.len());
//!
//! let opened = cipher.decrypt(&sealed).unwrap();
//! let parsed = parse_header(&opened);
//! assert!(parsed.is_complete());
//! assert_eq!(parsed.command, CommandType::ClientHandshake);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Session (feature-gated)
#[cfg(feature = "client")]
#[cfg_attr(docsrs, doc(cfg(feature = "client")))]
pub mod client;

// Lifecycle controller (feature-gated)
#[cfg(feature = "control")]
#[cfg_attr(docsrs, doc(cfg(feature = "control")))]
pub mod control;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core traits and types
    pub use crate::core::*;

    #[cfg(feature = "crypto")]
    pub use crate::crypto::*;

    #[cfg(feature = "transport")]
    pub use crate::transport::{
        parse_header, CommandType, Header, Identification, ParsedHeader, TunnelSocket,
    };

    #[cfg(feature = "client")]
    pub use crate::client::{ClientConfig, ClientConfigBuilder, ClientError, Session};

    #[cfg(feature = "control")]
    pub use crate::control::{
        ControlError, ControlState, Controller, NetworkSettings, StateChange, StateReceiver,
    };
}

// Re-export commonly used items at crate root
pub use crate::core::{ByteBuffer, NetworkConfigurator, OuternetError, Platform, TunDevice};

#[cfg(feature = "client")]
pub use crate::client::{ClientConfig, Session};

#[cfg(feature = "control")]
pub use crate::control::{ControlState, Controller};
