//! Outernet Protocol - Transport Layer
//!
//! - **Frame encoding/decoding**: [`Header`], [`parse_header`], and wire format handling
//! - **UDP socket**: [`TunnelSocket`] wrapper for tokio UDP with non-blocking receive
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Session (handshake, relay)       │
//! ├─────────────────────────────────────────┤
//! │         Transport Layer                 │  ← This module
//! │        frame header, socket             │
//! ├─────────────────────────────────────────┤
//! │      Crypto Layer (nonce || xor)        │
//! ├─────────────────────────────────────────┤
//! │              UDP                        │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Frames are built in the clear, then sealed as a whole by the crypto layer;
//! on receipt the datagram is opened first and the header parsed second.

mod frame;
mod socket;

pub use frame::*;
pub use socket::*;
