//! Protocol constants for the Outernet tunnel.
//!
//! Wire values are fixed by the server and MUST NOT be changed.

use std::net::Ipv4Addr;
use std::time::Duration;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Symmetric key size (SHA-256 of the shared secret).
pub const KEY_SIZE: usize = 32;

/// Stream cipher nonce size, prepended to every datagram.
pub const NONCE_SIZE: usize = 8;

/// Client identification size (SHA-256 of the username).
pub const IDENTIFICATION_SIZE: usize = 32;

/// ChaCha20 block size in bytes.
pub const BLOCK_SIZE: usize = 64;

// =============================================================================
// COMMAND TAGS
// =============================================================================

/// Unknown / unset command.
pub const CMD_UNKNOWN: u8 = 0x00;

/// Handshake request (client -> server).
pub const CMD_CLIENT_HANDSHAKE: u8 = 0x01;

/// Handshake response carrying tunnel and peer addresses (server -> client).
pub const CMD_SERVER_HANDSHAKE: u8 = 0x02;

/// IP packet from the client.
pub const CMD_CLIENT_DATA: u8 = 0x03;

/// IP packet from the server.
pub const CMD_SERVER_DATA: u8 = 0x04;

// =============================================================================
// BUFFERS
// =============================================================================

/// Initial physical capacity of a [`ByteBuffer`](super::ByteBuffer).
pub const DEFAULT_BUFFER_CAPACITY: usize = 512;

/// Largest datagram the session will read in one receive.
pub const RECV_BUFFER_SIZE: usize = 2048;

// =============================================================================
// TIMING
// =============================================================================

/// Minimum spacing between two handshake attempts.
pub const HANDSHAKE_INTERVAL: Duration = Duration::from_secs(1);

/// Handshake attempts before the session gives up.
pub const HANDSHAKE_MAX_ATTEMPTS: u32 = 5;

/// Sleep applied when a relay iteration moved no data.
pub const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Controller polling period while waiting for the handshake.
pub const CONTROL_POLL_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// OS NETWORK DEFAULTS
// =============================================================================

/// Netmask assigned to the tunnel interface.
pub const TUNNEL_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// MTU of the tunnel interface.
pub const TUNNEL_MTU: u32 = 1400;

/// Primary DNS server configured on the tunnel interface.
pub const PRIMARY_DNS: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);

/// Secondary DNS server configured on the tunnel interface.
pub const SECONDARY_DNS: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

/// Destination of the default-route override.
pub const DEFAULT_ROUTE: Ipv4Addr = Ipv4Addr::UNSPECIFIED;

/// Prefix length of the default-route override.
pub const DEFAULT_ROUTE_PREFIX: u8 = 0;
