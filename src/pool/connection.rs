//! Pooled connection
//!
//! One live remote session hosting a bounded number of channels. The
//! channel registry and the session are guarded by a single per-connection
//! mutex, so channel creation and closure never run concurrently on the
//! same session.

use super::channel::Channel;
use super::ChannelKind;
use crate::error::MuxPoolError;
use crate::transport::Session;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Inner<S: Session> {
    session: S,
    /// Ids of channels currently out with borrowers
    channels: HashSet<u64>,
    /// A parked connection refuses new channels until the pool hands it
    /// out again; set in the same critical section that empties the
    /// registry, so the reuse scan and the return path cannot both treat
    /// the connection as usable.
    parked: bool,
}

/// One live remote session capable of hosting multiple channels
pub struct Connection<S: Session> {
    id: u64,
    host: String,
    capacity: usize,
    next_channel_id: AtomicU64,
    inner: Mutex<Inner<S>>,
}

impl<S: Session> Connection<S> {
    /// Wrap an authenticated session
    pub(crate) fn new(id: u64, host: String, session: S, capacity: usize) -> Self {
        Connection {
            id,
            host,
            capacity,
            next_channel_id: AtomicU64::new(0),
            inner: Mutex::new(Inner {
                session,
                channels: HashSet::new(),
                parked: false,
            }),
        }
    }

    /// Identity of this connection within its pool
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Host this connection is established against
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Channel capacity of this connection
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Open a new channel of the given kind
    ///
    /// Returns `Ok(None)` when the connection is at capacity (or parked);
    /// this is a normal control-flow outcome, not an error. Returns `Err`
    /// only when the transport fails to open the channel, in which case
    /// the connection remains usable.
    pub async fn open_channel(
        &self,
        kind: ChannelKind,
    ) -> Result<Option<Channel<S::Channel>>, MuxPoolError> {
        let mut inner = self.inner.lock().await;
        if inner.parked || inner.channels.len() >= self.capacity {
            return Ok(None);
        }

        let handle = inner.session.open_channel(kind).await?;
        let id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
        inner.channels.insert(id);
        debug!(
            "opened {} channel {} on connection {} ({}/{})",
            kind,
            id,
            self.id,
            inner.channels.len(),
            self.capacity
        );
        Ok(Some(Channel::new(id, kind, handle)))
    }

    /// Release a channel previously opened on this connection
    ///
    /// Always succeeds from the caller's point of view; close failures are
    /// logged and swallowed, and the channel is deregistered regardless.
    /// Returns true when this release emptied the registry and parked the
    /// connection, meaning the caller must hand it back to the pool.
    pub async fn release_channel(&self, mut channel: Channel<S::Channel>) -> bool {
        let mut inner = self.inner.lock().await;

        if let Err(e) = channel.close().await {
            debug!(
                "ignoring close failure for channel {} on connection {}: {}",
                channel.id(),
                self.id,
                e
            );
        }
        if !inner.channels.remove(&channel.id()) {
            warn!(
                "released channel {} was not registered on connection {}",
                channel.id(),
                self.id
            );
        }

        if inner.channels.is_empty() && !inner.parked {
            inner.parked = true;
            return true;
        }
        false
    }

    /// Park the connection if it hosts no channels
    ///
    /// Used by the manager when a freshly acquired connection never
    /// received its first channel. Returns true if the connection is now
    /// parked and must go back to the pool.
    pub(crate) async fn park_if_empty(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.channels.is_empty() && !inner.parked {
            inner.parked = true;
            return true;
        }
        false
    }

    /// Make a connection just handed out by the pool accept channels again
    pub(crate) async fn unpark(&self) {
        self.inner.lock().await.parked = false;
    }

    /// Number of channels currently hosted
    pub async fn active_channel_count(&self) -> usize {
        self.inner.lock().await.channels.len()
    }

    /// Whether the connection is at channel capacity
    pub async fn is_full(&self) -> bool {
        self.inner.lock().await.channels.len() >= self.capacity
    }

    /// Whether the underlying session is connected and authenticated
    pub async fn is_alive(&self) -> bool {
        let inner = self.inner.lock().await;
        inner.session.is_connected() && inner.session.is_authenticated()
    }

    /// Tear the connection down
    ///
    /// Disconnects the session, which closes any channels still open at
    /// the transport level, and clears the registry. Idempotent; never
    /// fails.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        inner.parked = true;
        let open = inner.channels.len();
        if open > 0 {
            debug!(
                "closing connection {} with {} channels still open",
                self.id, open
            );
        }
        inner.channels.clear();
        inner.session.disconnect().await;
        debug!("closed connection {} to {}", self.id, self.host);
    }
}

impl<S: Session> std::fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("host", &self.host)
            .field("capacity", &self.capacity)
            .finish()
    }
}
