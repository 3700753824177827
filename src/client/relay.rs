//! The session relay loop.
//!
//! One iteration:
//!
//! 1. handshake (throttled) while not handshaked
//! 2. device -> socket: one outbound packet, wrapped in a ClientData frame
//! 3. socket -> device: one datagram, decrypted and checked against the phase
//! 4. short sleep if nothing moved
//!
//! Device and socket are both polled without blocking, so neither direction
//! can stall the other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::core::{ByteBuffer, DeviceError, TunDevice};
use crate::crypto::CipherBox;
use crate::transport::{parse_header, Header, Identification, TunnelSocket};

use super::handshake::{HandshakeAction, HandshakeRetry};

/// State read by both the relay loop and its owner.
#[derive(Debug, Default)]
pub(crate) struct SessionShared {
    pub(crate) running: AtomicBool,
    pub(crate) handshaked: AtomicBool,
    /// `(tunnel, peer)` as decoded from the ServerHandshake.
    pub(crate) addrs: Mutex<Option<(u32, u32)>>,
}

impl SessionShared {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn is_handshaked(&self) -> bool {
        self.handshaked.load(Ordering::Acquire)
    }

    pub(crate) fn addrs(&self) -> Option<(u32, u32)> {
        *self.addrs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_addrs(&self, addrs: Option<(u32, u32)>) {
        *self.addrs.lock().unwrap_or_else(PoisonError::into_inner) = addrs;
    }
}

/// Everything the relay loop owns while it runs.
pub(crate) struct Relay {
    pub(crate) socket: TunnelSocket,
    pub(crate) cipher: CipherBox,
    pub(crate) identification: Identification,
    pub(crate) device: Arc<dyn TunDevice>,
    pub(crate) retry: HandshakeRetry,
    pub(crate) idle_backoff: Duration,
    pub(crate) shared: Arc<SessionShared>,
}

impl Relay {
    /// Run until the shared `running` flag drops, then hand the state back.
    pub(crate) async fn run(mut self) -> Self {
        debug!("relay loop started");
        while self.shared.is_running() {
            if !self.shared.is_handshaked() && !self.handshake().await {
                break;
            }

            let sent = self.relay_outbound().await;
            let received = self.relay_inbound();

            if !sent && !received {
                tokio::time::sleep(self.idle_backoff).await;
            }
        }
        debug!("relay loop exited");
        self
    }

    /// Returns `false` once the retry budget is spent.
    async fn handshake(&mut self) -> bool {
        match self.retry.poll(Instant::now()) {
            HandshakeAction::Wait => true,
            HandshakeAction::GiveUp => {
                warn!(
                    attempts = self.retry.attempts(),
                    "no handshake response, giving up"
                );
                self.shared.running.store(false, Ordering::Release);
                false
            }
            HandshakeAction::Send(attempt) => {
                debug!(attempt, "sending handshake");
                let frame = Header::ClientHandshake {
                    identification: self.identification,
                };
                let mut buf = frame.to_bytes();
                self.cipher.encrypt_in_place(&mut buf);
                if let Err(e) = self.socket.send(&buf).await {
                    warn!(attempt, error = %e, "handshake send failed");
                }
                true
            }
        }
    }

    /// Move one packet from the device to the server.
    async fn relay_outbound(&mut self) -> bool {
        let packet = match self.device.read_packet() {
            Ok(Some(packet)) => packet,
            Ok(None) => return false,
            Err(DeviceError::NotReady) => {
                trace!("device session not started");
                return false;
            }
            Err(e) => {
                debug!(error = %e, "device read failed");
                return false;
            }
        };

        let header = Header::ClientData {
            identification: self.identification,
        };
        let mut buf = ByteBuffer::with_capacity(header.encoded_len() + packet.len());
        header.encode(&mut buf);
        buf.insert_back(&packet);
        self.cipher.encrypt_in_place(&mut buf);

        match self.socket.send(&buf).await {
            Ok(_) => trace!(len = packet.len(), "packet sent"),
            Err(e) => debug!(error = %e, "packet send failed"),
        }
        true
    }

    /// Move one datagram from the server to the device.
    fn relay_inbound(&mut self) -> bool {
        let mut buf = match self.socket.try_recv() {
            Ok(Some(data)) => ByteBuffer::from(data),
            Ok(None) => return false,
            Err(e) => {
                debug!(error = %e, "socket receive failed");
                return false;
            }
        };

        if let Err(e) = self.cipher.decrypt_in_place(&mut buf) {
            debug!(error = %e, "dropping datagram");
            return true;
        }

        let parsed = parse_header(&buf);
        if !self.shared.is_handshaked() {
            match parsed.header {
                Some(Header::ServerHandshake {
                    tunnel_addr,
                    peer_addr,
                }) => self.complete_handshake(tunnel_addr, peer_addr),
                _ => debug!(command = ?parsed.command, "unexpected frame before handshake"),
            }
            return true;
        }

        match parsed.header {
            Some(Header::ServerData) => {
                buf.remove_front(parsed.consumed);
                match self.device.write_packet(&buf) {
                    Ok(()) => trace!(len = buf.len(), "packet delivered"),
                    Err(DeviceError::Overflow) => debug!("device ring full, packet dropped"),
                    Err(e) => warn!(error = %e, "device write failed"),
                }
            }
            _ => debug!(command = ?parsed.command, "unexpected frame"),
        }
        true
    }

    fn complete_handshake(&mut self, tunnel_addr: u32, peer_addr: u32) {
        self.shared.set_addrs(Some((tunnel_addr, peer_addr)));
        self.shared.handshaked.store(true, Ordering::Release);
        info!(
            tunnel = %crate::transport::ipv4_from_wire(tunnel_addr),
            peer = %crate::transport::ipv4_from_wire(peer_addr),
            attempts = self.retry.attempts(),
            "handshake complete"
        );
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("server", &self.socket.server_addr())
            .field("identification", &self.identification)
            .field("attempts", &self.retry.attempts())
            .finish_non_exhaustive()
    }
}
