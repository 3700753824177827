//! Collaborator interfaces consumed by the tunnel core.
//!
//! The core never talks to a driver or to the OS routing table directly.
//! Platform code implements these traits; tests implement them with fakes.

use std::net::Ipv4Addr;
use std::sync::Arc;

use super::error::{DeviceError, NetworkError};

/// A virtual network adapter (TUN device).
///
/// All methods take `&self`: the relay loop reads and writes packets while
/// the controller drives the session lifecycle, so implementations must be
/// internally synchronized. Packet I/O MUST NOT block.
pub trait TunDevice: Send + Sync {
    /// Open or create the adapter.
    fn init(&self) -> Result<(), DeviceError>;

    /// Start the data session. Packet I/O fails with
    /// [`DeviceError::NotReady`] until this succeeds.
    fn start_session(&self) -> Result<(), DeviceError>;

    /// End the data session.
    fn close_session(&self) -> Result<(), DeviceError>;

    /// Release the adapter, closing the session first if still open.
    fn uninit(&self) -> Result<(), DeviceError>;

    /// Read one outbound IP packet.
    ///
    /// Returns `Ok(None)` when no packet is queued.
    fn read_packet(&self) -> Result<Option<Vec<u8>>, DeviceError>;

    /// Deliver one inbound IP packet to the OS.
    ///
    /// Fails with [`DeviceError::Overflow`] when the ring is full.
    fn write_packet(&self, packet: &[u8]) -> Result<(), DeviceError>;
}

/// IPv4 parameters applied to the tunnel interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Setup {
    /// Tunnel server; gets a host route through the physical interface.
    pub server: Ipv4Addr,
    /// Address assigned to the tunnel interface.
    pub address: Ipv4Addr,
    /// Gateway on the far side of the tunnel.
    pub gateway: Ipv4Addr,
    /// Interface netmask.
    pub netmask: Ipv4Addr,
    /// Interface MTU.
    pub mtu: u32,
    /// Primary DNS server.
    pub primary_dns: Ipv4Addr,
    /// Secondary DNS server.
    pub secondary_dns: Ipv4Addr,
}

/// OS routing and DNS configuration.
pub trait NetworkConfigurator: Send {
    /// Configure the tunnel interface, DNS, and a host route to the server.
    fn init_network_ipv4(&mut self, setup: &Ipv4Setup) -> Result<(), NetworkError>;

    /// Revert everything done by [`init_network_ipv4`](Self::init_network_ipv4).
    fn uninit_network(&mut self) -> Result<(), NetworkError>;

    /// Route `ip/prefix` through the tunnel.
    fn add_route(&mut self, ip: Ipv4Addr, prefix: u8) -> Result<(), NetworkError>;

    /// Remove a route added by [`add_route`](Self::add_route).
    fn del_route(&mut self, ip: Ipv4Addr, prefix: u8) -> Result<(), NetworkError>;
}

/// Factory for the per-connection collaborators.
///
/// The controller asks for a fresh device handle and configurator at the
/// start of every connect cycle and drops them after teardown.
pub trait Platform: Send + Sync + 'static {
    /// Create the virtual adapter handle.
    fn tun_device(&self) -> Arc<dyn TunDevice>;

    /// Create the OS network configurator.
    fn network_configurator(&self) -> Box<dyn NetworkConfigurator>;
}
