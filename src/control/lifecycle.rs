//! One connect/disconnect cycle.
//!
//! Setup walks the stages in order and records each one that succeeded.
//! Teardown then undoes exactly those stages, newest first, and keeps going
//! when an individual step fails.

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{ClientConfig, ClientError, Session};
use crate::core::{
    DeviceError, Ipv4Setup, NetworkConfigurator, NetworkError, Platform, TunDevice,
    DEFAULT_ROUTE, DEFAULT_ROUTE_PREFIX,
};

use super::settings::NetworkSettings;
use super::state::{ControlState, StateSender};

/// Why a run failed. The `Display` text is published with
/// [`ControlState::Error`].
#[derive(Debug, Error)]
pub enum ControlError {
    /// The TUN device could not be opened.
    #[error("tun init failed")]
    DeviceInit(#[source] DeviceError),

    /// The session could not be initialized.
    #[error("client init error")]
    SessionInit(#[source] ClientError),

    /// The relay loop could not be started.
    #[error("client run error")]
    SessionRun(#[source] ClientError),

    /// The server never answered the handshake.
    #[error("client connect timeout")]
    ConnectTimeout,

    /// OS interface, DNS or server route setup failed.
    #[error("syshelper init network ipv4 failed")]
    NetworkInit(#[source] NetworkError),

    /// The device data session could not be started.
    #[error("tun session start failed")]
    DeviceSession(#[source] DeviceError),

    /// The default route could not be installed.
    #[error("add route failed")]
    AddRoute(#[source] NetworkError),
}

/// Stages that completed and must be undone.
#[derive(Debug, Default, Clone, Copy)]
struct Stages {
    device_inited: bool,
    session_inited: bool,
    session_running: bool,
    network_inited: bool,
    device_session: bool,
    route_added: bool,
}

pub(crate) struct Lifecycle {
    config: ClientConfig,
    settings: NetworkSettings,
    device: Arc<dyn TunDevice>,
    network: Box<dyn NetworkConfigurator>,
    session: Session,
    states: StateSender,
    stages: Stages,
}

impl Lifecycle {
    pub(crate) fn new(
        platform: &dyn Platform,
        config: ClientConfig,
        settings: NetworkSettings,
        states: StateSender,
    ) -> Self {
        Self {
            config,
            settings,
            device: platform.tun_device(),
            network: platform.network_configurator(),
            session: Session::new(),
            states,
            stages: Stages::default(),
        }
    }

    /// Set up, wait for a stop request, tear down.
    pub(crate) async fn run(mut self, mut stop: watch::Receiver<bool>) {
        match self.setup().await {
            Ok(()) => {
                self.states.emit(ControlState::Connected);
                // A dropped sender means the controller is gone.
                let _ = stop.wait_for(|stopped| *stopped).await;
                debug!("stop requested");
            }
            Err(e) => {
                let source = std::error::Error::source(&e).map(ToString::to_string);
                warn!(error = %e, source = ?source, "setup failed");
                self.states.emit_error(e.to_string());
            }
        }
        self.teardown().await;
    }

    async fn setup(&mut self) -> Result<(), ControlError> {
        self.states.emit(ControlState::Connecting);
        self.device.init().map_err(ControlError::DeviceInit)?;
        self.stages.device_inited = true;

        self.session
            .init(&self.config, Arc::clone(&self.device))
            .await
            .map_err(ControlError::SessionInit)?;
        self.stages.session_inited = true;

        self.session.run().await.map_err(ControlError::SessionRun)?;
        self.stages.session_running = true;

        let (tunnel, peer) = wait_for_handshake(&self.session, self.settings.poll_interval).await?;
        info!(%tunnel, %peer, "handshake complete");

        self.states.emit(ControlState::SettingUp);
        let setup = ipv4_setup(&self.session, tunnel, peer, &self.settings)?;
        self.network
            .init_network_ipv4(&setup)
            .map_err(ControlError::NetworkInit)?;
        self.stages.network_inited = true;

        self.device
            .start_session()
            .map_err(ControlError::DeviceSession)?;
        self.stages.device_session = true;

        self.states.emit(ControlState::AddingRoute);
        self.network
            .add_route(DEFAULT_ROUTE, DEFAULT_ROUTE_PREFIX)
            .map_err(ControlError::AddRoute)?;
        self.stages.route_added = true;

        Ok(())
    }

    async fn teardown(&mut self) {
        self.states.emit(ControlState::Disconnecting);
        let stages = std::mem::take(&mut self.stages);

        if stages.route_added {
            if let Err(e) = self.network.del_route(DEFAULT_ROUTE, DEFAULT_ROUTE_PREFIX) {
                warn!(error = %e, "del route failed");
            }
        }
        if stages.network_inited {
            if let Err(e) = self.network.uninit_network() {
                warn!(error = %e, "uninit network failed");
            }
        }
        if stages.session_running {
            self.session.stop().await;
        }
        if stages.session_inited {
            self.session.uninit().await;
        }
        if stages.device_session {
            if let Err(e) = self.device.close_session() {
                warn!(error = %e, "close tun session failed");
            }
        }
        if stages.device_inited {
            if let Err(e) = self.device.uninit() {
                warn!(error = %e, "tun uninit failed");
            }
        }

        self.states.emit(ControlState::Disconnected);
    }
}

/// Poll until the session either handshakes or stops.
async fn wait_for_handshake(
    session: &Session,
    poll_interval: Duration,
) -> Result<(Ipv4Addr, Ipv4Addr), ControlError> {
    while session.is_running() && !session.is_handshaked() {
        tokio::time::sleep(poll_interval).await;
    }
    if !session.is_handshaked() {
        return Err(ControlError::ConnectTimeout);
    }
    match (session.tunnel_addr(), session.peer_addr()) {
        (Some(tunnel), Some(peer)) => Ok((tunnel, peer)),
        _ => Err(ControlError::ConnectTimeout),
    }
}

/// Interface setup for a handshaked session: the peer address goes on the
/// interface and the tunnel address is the gateway.
fn ipv4_setup(
    session: &Session,
    tunnel: Ipv4Addr,
    peer: Ipv4Addr,
    settings: &NetworkSettings,
) -> Result<Ipv4Setup, ControlError> {
    let server = session
        .server_addr()
        .ok_or(ControlError::SessionInit(ClientError::NotInitialized))?;
    Ok(Ipv4Setup {
        server: *server.ip(),
        address: peer,
        gateway: tunnel,
        netmask: settings.netmask,
        mtu: settings.mtu,
        primary_dns: settings.primary_dns,
        secondary_dns: settings.secondary_dns,
    })
}
