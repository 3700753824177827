//! Network parameters applied by the controller.

use std::net::Ipv4Addr;
use std::time::Duration;

use crate::core::{
    CONTROL_POLL_INTERVAL, PRIMARY_DNS, SECONDARY_DNS, TUNNEL_MTU, TUNNEL_NETMASK,
};

/// Interface and DNS settings used for every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkSettings {
    /// Tunnel interface netmask.
    pub netmask: Ipv4Addr,
    /// Tunnel interface MTU.
    pub mtu: u32,
    /// Primary DNS server.
    pub primary_dns: Ipv4Addr,
    /// Secondary DNS server.
    pub secondary_dns: Ipv4Addr,
    /// How often the handshake wait checks the session.
    pub poll_interval: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            netmask: TUNNEL_NETMASK,
            mtu: TUNNEL_MTU,
            primary_dns: PRIMARY_DNS,
            secondary_dns: SECONDARY_DNS,
            poll_interval: CONTROL_POLL_INTERVAL,
        }
    }
}
