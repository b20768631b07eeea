//! Borrowed channel structure
//!
//! Represents a single channel handed out by a connection, tagged with its
//! kind and registration id.

use super::ChannelKind;
use crate::error::MuxPoolError;
use crate::transport::ChannelHandle;
use std::ops::{Deref, DerefMut};
use std::time::Instant;

/// A channel borrowed from a connection
///
/// Carries the transport handle plus the bookkeeping the owning connection
/// needs to deregister it on release. The borrower drives the handle's data
/// plane through `Deref`; the pool only ever closes it.
#[derive(Debug)]
pub struct Channel<H: ChannelHandle> {
    /// Registration id within the owning connection
    id: u64,
    /// Which kind of channel this is
    kind: ChannelKind,
    /// The transport handle (None once closed)
    handle: Option<H>,
    /// When the channel was opened
    opened_at: Instant,
}

impl<H: ChannelHandle> Channel<H> {
    /// Create a new channel wrapper
    pub(crate) fn new(id: u64, kind: ChannelKind, handle: H) -> Self {
        Channel {
            id,
            kind,
            handle: Some(handle),
            opened_at: Instant::now(),
        }
    }

    /// Registration id within the owning connection
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The kind of this channel
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// How long ago the channel was opened
    pub fn age(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }

    /// Get a reference to the transport handle
    pub fn handle(&self) -> &H {
        self.handle.as_ref().expect("channel already closed")
    }

    /// Get a mutable reference to the transport handle
    pub fn handle_mut(&mut self) -> &mut H {
        self.handle.as_mut().expect("channel already closed")
    }

    /// Close the underlying handle
    ///
    /// Idempotent; closing an already-closed channel is a no-op.
    pub(crate) async fn close(&mut self) -> Result<(), MuxPoolError> {
        match self.handle.take() {
            Some(mut handle) => handle.close().await,
            None => Ok(()),
        }
    }
}

impl<H: ChannelHandle> Deref for Channel<H> {
    type Target = H;

    fn deref(&self) -> &Self::Target {
        self.handle()
    }
}

impl<H: ChannelHandle> DerefMut for Channel<H> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.handle_mut()
    }
}
