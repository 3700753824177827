//! Tunnel session.
//!
//! A [`Session`] owns one UDP socket, the cipher and the client
//! identification. [`Session::run`] spawns the relay loop, which handshakes
//! with the server and then relays packets between the TUN device and the
//! socket until [`Session::stop`] is called or the handshake gives up.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::core::TunDevice;
use crate::crypto::{derive_identification, CipherBox};
use crate::transport::{ipv4_from_wire, Identification, TunnelSocket};

use super::config::ClientConfig;
use super::handshake::HandshakeRetry;
use super::relay::{Relay, SessionShared};

/// Errors that can occur in the tunnel session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `init` called twice without `uninit`.
    #[error("session already initialized")]
    AlreadyInitialized,

    /// Operation requires `init` first.
    #[error("session not initialized")]
    NotInitialized,

    /// `run` called while the relay loop is active.
    #[error("session already running")]
    AlreadyRunning,

    /// The configured server address is not an IPv4 address.
    #[error("invalid server address: {0}")]
    InvalidServerAddress(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One client session with a tunnel server.
///
/// # Example
///
/// ```ignore
/// use outernet::client::{ClientConfigBuilder, Session};
///
/// let config = ClientConfigBuilder::new()
///     .server("203.0.113.7", 7000)
///     .username("alice")
///     .secret("hunter2")
///     .build();
///
/// let mut session = Session::new();
/// session.init(&config, device).await?;
/// session.run().await?;
///
/// while session.is_running() && !session.is_handshaked() {
///     tokio::time::sleep(Duration::from_millis(100)).await;
/// }
/// println!("tunnel {:?} peer {:?}", session.tunnel_addr(), session.peer_addr());
///
/// session.stop().await;
/// session.uninit().await;
/// ```
#[derive(Debug)]
pub struct Session {
    shared: Arc<SessionShared>,
    /// Present while initialized and not running.
    relay: Option<Relay>,
    /// Present while the relay loop is running (or finished but not reaped).
    task: Option<JoinHandle<Relay>>,
    server_addr: Option<SocketAddrV4>,
    span: Span,
}

impl Session {
    /// Create an uninitialized session.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SessionShared::default()),
            relay: None,
            task: None,
            server_addr: None,
            span: Span::none(),
        }
    }

    /// Bind the socket and derive the key and identification.
    pub async fn init(
        &mut self,
        config: &ClientConfig,
        device: Arc<dyn TunDevice>,
    ) -> Result<(), ClientError> {
        if self.is_inited() {
            return Err(ClientError::AlreadyInitialized);
        }

        let ip: Ipv4Addr = config
            .server_ip
            .trim()
            .parse()
            .map_err(|_| ClientError::InvalidServerAddress(config.server_ip.clone()))?;
        let server_addr = SocketAddrV4::new(ip, config.server_port);
        let socket = TunnelSocket::bind(server_addr).await?;

        self.span = info_span!("session", server = %server_addr);
        self.span
            .in_scope(|| debug!(local = ?socket.local_addr().ok(), "socket bound"));

        self.shared.handshaked.store(false, Ordering::Release);
        self.shared.set_addrs(None);
        self.relay = Some(Relay {
            socket,
            cipher: CipherBox::new(&config.secret),
            identification: Identification::from_bytes(derive_identification(&config.username)),
            device,
            retry: HandshakeRetry::new(config.handshake_interval, config.handshake_attempts),
            idle_backoff: config.idle_backoff,
            shared: Arc::clone(&self.shared),
        });
        self.server_addr = Some(server_addr);
        self.span.in_scope(|| info!("session initialized"));
        Ok(())
    }

    /// Start the relay loop on a background task.
    ///
    /// A loop that already exited on its own is reaped first, and the new
    /// loop starts with a fresh handshake budget.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        if let Some(task) = &self.task {
            if !task.is_finished() {
                return Err(ClientError::AlreadyRunning);
            }
            self.reap().await;
        }

        let mut relay = self.relay.take().ok_or(ClientError::NotInitialized)?;
        relay.retry.reset();
        self.shared.handshaked.store(false, Ordering::Release);
        self.shared.set_addrs(None);
        self.shared.running.store(true, Ordering::Release);

        self.task = Some(tokio::spawn(relay.run().instrument(self.span.clone())));
        self.span.in_scope(|| info!("session running"));
        Ok(())
    }

    /// Signal the relay loop to exit and wait for it. No-op when not running.
    pub async fn stop(&mut self) {
        self.shared.handshaked.store(false, Ordering::Release);
        self.shared.running.store(false, Ordering::Release);
        if self.task.is_some() {
            self.reap().await;
            // The loop may complete a handshake between the first store and its exit.
            self.shared.handshaked.store(false, Ordering::Release);
            self.span.in_scope(|| info!("session stopped"));
        }
    }

    /// Stop if running and release the socket, cipher and device handle.
    pub async fn uninit(&mut self) {
        self.stop().await;
        if self.relay.take().is_some() {
            self.span.in_scope(|| debug!("session released"));
        }
        self.shared.set_addrs(None);
        self.server_addr = None;
    }

    async fn reap(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.await {
            Ok(relay) => self.relay = Some(relay),
            Err(e) => {
                self.span.in_scope(|| warn!(error = %e, "relay task failed"));
            }
        }
    }

    /// Returns `true` between `init` and `uninit`.
    pub fn is_inited(&self) -> bool {
        self.relay.is_some() || self.task.is_some()
    }

    /// Returns `true` while the relay loop is meant to run.
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Returns `true` once the server answered the handshake.
    pub fn is_handshaked(&self) -> bool {
        self.shared.is_handshaked()
    }

    /// Tunnel address from the handshake.
    pub fn tunnel_addr(&self) -> Option<Ipv4Addr> {
        self.shared.addrs().map(|(tunnel, _)| ipv4_from_wire(tunnel))
    }

    /// Peer address from the handshake.
    pub fn peer_addr(&self) -> Option<Ipv4Addr> {
        self.shared.addrs().map(|(_, peer)| ipv4_from_wire(peer))
    }

    /// Server address set by `init`.
    pub fn server_addr(&self) -> Option<SocketAddrV4> {
        self.server_addr
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // The detached loop sees this on its next iteration.
        self.shared.running.store(false, Ordering::Release);
    }
}
