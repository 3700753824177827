//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{HANDSHAKE_INTERVAL, HANDSHAKE_MAX_ATTEMPTS, IDLE_BACKOFF};

/// Connection settings for one tunnel server.
///
/// The four connection fields serialize with the keys used by the
/// `configs.json` file of existing installations; timing fields are not
/// persisted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientConfig {
    /// Server IPv4 address in dotted-quad form.
    pub server_ip: String,

    /// Server UDP port.
    pub server_port: u16,

    /// Username; its SHA-256 identifies the client to the server.
    pub username: String,

    /// Pre-shared secret; its SHA-256 is the cipher key.
    pub secret: String,

    /// Minimum spacing between handshake attempts.
    #[serde(skip, default = "default_handshake_interval")]
    pub handshake_interval: Duration,

    /// Handshake attempts before the session gives up.
    #[serde(skip, default = "default_handshake_attempts")]
    pub handshake_attempts: u32,

    /// Sleep applied when a relay iteration moved no data.
    #[serde(skip, default = "default_idle_backoff")]
    pub idle_backoff: Duration,
}

fn default_handshake_interval() -> Duration {
    HANDSHAKE_INTERVAL
}

fn default_handshake_attempts() -> u32 {
    HANDSHAKE_MAX_ATTEMPTS
}

fn default_idle_backoff() -> Duration {
    IDLE_BACKOFF
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_ip: String::new(),
            server_port: 0,
            username: String::new(),
            secret: String::new(),
            handshake_interval: HANDSHAKE_INTERVAL,
            handshake_attempts: HANDSHAKE_MAX_ATTEMPTS,
            idle_backoff: IDLE_BACKOFF,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_ip", &self.server_ip)
            .field("server_port", &self.server_port)
            .field("username", &self.username)
            .field("secret", &"[redacted]")
            .field("handshake_interval", &self.handshake_interval)
            .field("handshake_attempts", &self.handshake_attempts)
            .field("idle_backoff", &self.idle_backoff)
            .finish()
    }
}

/// Builder for creating a [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with default timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server address and port.
    pub fn server(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.config.server_ip = ip.into();
        self.config.server_port = port;
        self
    }

    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    /// Set the pre-shared secret.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.config.secret = secret.into();
        self
    }

    /// Set the handshake retry spacing.
    pub fn handshake_interval(mut self, interval: Duration) -> Self {
        self.config.handshake_interval = interval;
        self
    }

    /// Set the number of handshake attempts.
    pub fn handshake_attempts(mut self, attempts: u32) -> Self {
        self.config.handshake_attempts = attempts;
        self
    }

    /// Set the idle backoff of the relay loop.
    pub fn idle_backoff(mut self, backoff: Duration) -> Self {
        self.config.idle_backoff = backoff;
        self
    }

    /// Build the client configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
