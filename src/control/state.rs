//! Controller states and the notification channel.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{error, info};

/// Lifecycle state of the tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlState {
    /// Idle; a new run may start.
    Disconnected,
    /// Opening the device and handshaking with the server.
    Connecting,
    /// Configuring the OS network and starting the device session.
    SettingUp,
    /// Installing the default route through the tunnel.
    AddingRoute,
    /// Traffic flows through the tunnel.
    Connected,
    /// Tearing down whatever the run set up.
    Disconnecting,
    /// Setup failed; teardown follows.
    Error,
}

impl ControlState {
    /// Check if the tunnel carries traffic.
    pub fn is_connected(&self) -> bool {
        matches!(self, ControlState::Connected)
    }

    /// Check if this is the failure state.
    pub fn is_error(&self) -> bool {
        matches!(self, ControlState::Error)
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlState::Disconnected => "Disconnected",
            ControlState::Connecting => "Connecting",
            ControlState::SettingUp => "SettingUp",
            ControlState::AddingRoute => "AddingRoute",
            ControlState::Connected => "Connected",
            ControlState::Disconnecting => "Disconnecting",
            ControlState::Error => "Error",
        };
        f.write_str(name)
    }
}

/// One state transition, as delivered to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    /// The new state.
    pub state: ControlState,
    /// Human-readable detail; set for [`ControlState::Error`].
    pub message: Option<String>,
}

/// Receiving end of the controller's state notifications.
///
/// Notifications arrive on the controller's worker task; a consumer bound
/// to a UI thread redispatches them itself.
#[derive(Debug)]
pub struct StateReceiver {
    rx: mpsc::UnboundedReceiver<StateChange>,
}

impl StateReceiver {
    /// Receive the next state change.
    ///
    /// Returns `None` once the controller and its runs are gone.
    pub async fn recv(&mut self) -> Option<StateChange> {
        self.rx.recv().await
    }

    /// Receive a state change if one is queued.
    pub fn try_recv(&mut self) -> Option<StateChange> {
        self.rx.try_recv().ok()
    }
}

/// Sending end, shared by the worker and its runs.
#[derive(Debug, Clone)]
pub(crate) struct StateSender {
    tx: mpsc::UnboundedSender<StateChange>,
}

impl StateSender {
    pub(crate) fn emit(&self, state: ControlState) {
        info!(%state, "state changed");
        self.send(StateChange {
            state,
            message: None,
        });
    }

    pub(crate) fn emit_error(&self, message: String) {
        error!(reason = %message, "state changed to Error");
        self.send(StateChange {
            state: ControlState::Error,
            message: Some(message),
        });
    }

    fn send(&self, change: StateChange) {
        // Nobody listening is fine.
        let _ = self.tx.send(change);
    }
}

pub(crate) fn channel() -> (StateSender, StateReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StateSender { tx }, StateReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_order() {
        let (tx, mut rx) = channel();
        tx.emit(ControlState::Connecting);
        tx.emit_error("tun init failed".into());

        assert_eq!(
            rx.try_recv(),
            Some(StateChange {
                state: ControlState::Connecting,
                message: None
            })
        );
        let err = rx.try_recv().unwrap();
        assert!(err.state.is_error());
        assert_eq!(err.message.as_deref(), Some("tun init failed"));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_emit_without_receiver() {
        let (tx, rx) = channel();
        drop(rx);
        tx.emit(ControlState::Disconnected);
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlState::AddingRoute.to_string(), "AddingRoute");
        assert!(ControlState::Connected.is_connected());
    }
}
