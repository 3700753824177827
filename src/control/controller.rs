//! Tunnel controller.
//!
//! `start` and `stop` are queued to a single worker task, so overlapping
//! calls are handled one at a time in the order they were made. The worker
//! spawns at most one lifecycle run at a time.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument, Span};

use crate::client::ClientConfig;
use crate::core::Platform;

use super::lifecycle::Lifecycle;
use super::settings::NetworkSettings;
use super::state::{self, ControlState, StateReceiver, StateSender};

enum Command {
    Start(ClientConfig, oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
}

/// Drives the tunnel through its lifecycle.
///
/// Must be created inside a Tokio runtime. Dropping the controller stops
/// any active run.
///
/// # Example
///
/// ```ignore
/// use outernet::control::Controller;
///
/// let (controller, mut states) = Controller::new(platform);
/// controller.start(config).await;
///
/// while let Some(change) = states.recv().await {
///     println!("{} {:?}", change.state, change.message);
///     if change.state.is_connected() {
///         break;
///     }
/// }
///
/// controller.stop().await;
/// ```
#[derive(Debug)]
pub struct Controller {
    commands: mpsc::UnboundedSender<Command>,
    span: Span,
}

impl Controller {
    /// Create a controller with the default network settings.
    ///
    /// Returns the controller and the receiver of its state changes. The
    /// first change is always [`ControlState::Disconnected`].
    pub fn new(platform: Arc<dyn Platform>) -> (Self, StateReceiver) {
        Self::with_settings(platform, NetworkSettings::default())
    }

    /// Create a controller with custom network settings.
    pub fn with_settings(
        platform: Arc<dyn Platform>,
        settings: NetworkSettings,
    ) -> (Self, StateReceiver) {
        let (states, receiver) = state::channel();
        let (commands, rx) = mpsc::unbounded_channel();
        let span = info_span!("controller");

        span.in_scope(|| states.emit(ControlState::Disconnected));

        let worker = Worker {
            platform,
            settings,
            states,
            active: None,
        };
        tokio::spawn(worker.run(rx).instrument(span.clone()));

        (Self { commands, span }, receiver)
    }

    /// Start a run with `config`. No-op while a run is active.
    ///
    /// Resolves once the run has been launched, not once it is connected;
    /// progress is reported through the [`StateReceiver`].
    pub async fn start(&self, config: ClientConfig) {
        let (done, wait) = oneshot::channel();
        self.submit(Command::Start(config, done), wait).await;
    }

    /// Stop the active run and wait for its teardown to finish. No-op when
    /// idle.
    pub async fn stop(&self) {
        let (done, wait) = oneshot::channel();
        self.submit(Command::Stop(done), wait).await;
    }

    async fn submit(&self, command: Command, wait: oneshot::Receiver<()>) {
        if self.commands.send(command).is_err() {
            self.span.in_scope(|| warn!("controller worker is gone"));
            return;
        }
        let _ = wait.await;
    }
}

struct ActiveRun {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Worker {
    platform: Arc<dyn Platform>,
    settings: NetworkSettings,
    states: StateSender,
    active: Option<ActiveRun>,
}

impl Worker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Start(config, done) => {
                    self.start(config).await;
                    let _ = done.send(());
                }
                Command::Stop(done) => {
                    self.stop().await;
                    let _ = done.send(());
                }
            }
        }
        debug!("controller dropped");
        self.stop().await;
    }

    async fn start(&mut self, config: ClientConfig) {
        if let Some(run) = &self.active {
            if !run.handle.is_finished() {
                debug!("start ignored, run already active");
                return;
            }
        }
        // Reap a run that ended on its own.
        self.stop().await;

        let (stop, stop_rx) = watch::channel(false);
        let lifecycle = Lifecycle::new(
            self.platform.as_ref(),
            config,
            self.settings,
            self.states.clone(),
        );
        let handle = tokio::spawn(lifecycle.run(stop_rx).in_current_span());
        self.active = Some(ActiveRun { stop, handle });
    }

    async fn stop(&mut self) {
        let Some(run) = self.active.take() else {
            return;
        };
        // The run may already be gone.
        let _ = run.stop.send(true);
        if let Err(e) = run.handle.await {
            warn!(error = %e, "lifecycle task failed");
        }
    }
}
