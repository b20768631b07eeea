//! Transport layer abstraction for Muxpool
//!
//! The pool never speaks a wire protocol itself. It consumes a transport
//! provider that can open an authenticated remote session, report the
//! session's liveness, and open channels of the requested kind within it.
//! Concrete transports (SSH, QUIC, a test double) implement these traits.

use crate::error::MuxPoolError;
use crate::pool::ChannelKind;
use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;

/// An opaque secret value
///
/// Wraps credential material so that it never appears in `Debug` output or
/// log lines. The inner value is only readable through [`Secret::expose`].
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    /// Read the secret value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Secret(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Secret(value.to_string())
    }
}

/// Credentials used to authenticate a session
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Username to authenticate as
    pub username: String,

    /// Secret used to prove the identity (password, token, key passphrase)
    pub secret: Secret,
}

impl Credentials {
    /// Create credentials from a username and secret
    pub fn new(username: impl Into<String>, secret: impl Into<Secret>) -> Self {
        Credentials {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

/// Transport provider for establishing remote sessions
///
/// Implementations connect to a remote host and hand back an
/// unauthenticated [`Session`]. Authentication is a separate step so that
/// the factory can tear the session down cleanly when it fails.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// The session type produced by this transport
    type Session: Session;

    /// Connect to a remote host
    ///
    /// Fails with [`MuxPoolError::Transport`] if the remote refuses the
    /// connection.
    async fn connect(&self, host: &str) -> Result<Self::Session, MuxPoolError>;
}

/// One live remote session capable of hosting channels
#[async_trait]
pub trait Session: Send + Sync + 'static {
    /// The channel handle type opened within this session
    type Channel: ChannelHandle;

    /// Authenticate the session
    ///
    /// Fails with [`MuxPoolError::Auth`] if the credentials are rejected.
    async fn authenticate(&mut self, credentials: &Credentials) -> Result<(), MuxPoolError>;

    /// Whether the underlying connection is still established
    fn is_connected(&self) -> bool;

    /// Whether the session has authenticated successfully
    fn is_authenticated(&self) -> bool;

    /// Open a new channel of the given kind
    ///
    /// Fails with [`MuxPoolError::Channel`] if the channel cannot be
    /// opened; the session itself remains usable after such a failure.
    async fn open_channel(&mut self, kind: ChannelKind) -> Result<Self::Channel, MuxPoolError>;

    /// Tear the session down
    ///
    /// Must be idempotent. Closes every channel still open at the
    /// transport level.
    async fn disconnect(&mut self);
}

/// A channel handle as seen by the pool
///
/// The pool never touches a channel's data plane; the only capability it
/// needs is `close`.
#[async_trait]
pub trait ChannelHandle: Send + 'static {
    /// Close the channel
    async fn close(&mut self) -> Result<(), MuxPoolError>;
}
