//! Outernet client session.
//!
//! Handshake and packet relay against one tunnel server.

#[allow(clippy::module_inception)]
mod client;
mod config;
pub mod handshake;
mod relay;

pub use client::*;
pub use config::*;
pub use handshake::{HandshakeAction, HandshakeRetry};
