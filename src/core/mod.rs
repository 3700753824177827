//! Core types for the Outernet tunnel.
//!
//! This module contains the foundational types used throughout the crate:
//! - [`ByteBuffer`]: growable byte storage for frames and packets
//! - Collaborator traits: [`TunDevice`], [`NetworkConfigurator`], [`Platform`]
//! - Error types
//! - Protocol constants

mod buffer;
mod constants;
mod error;
mod traits;

pub use buffer::*;
pub use constants::*;
pub use error::*;
pub use traits::*;
