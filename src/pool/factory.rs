//! Connection factory
//!
//! The generic factory seam consumed by [`super::ResourcePool`], plus the
//! transport-backed implementation that manufactures authenticated
//! connections.

use super::connection::Connection;
use crate::error::MuxPoolError;
use crate::transport::{Credentials, Transport};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Factory for pooled resources
///
/// The pool calls `create` when it needs a new instance, `validate`
/// before handing an idle instance out, and `destroy` when an instance is
/// evicted or the pool shuts down.
#[async_trait]
pub trait ResourceFactory: Send + Sync + 'static {
    /// The resource type managed by the pool
    type Resource: Send + Sync + 'static;

    /// Manufacture a new resource
    ///
    /// Must never return a half-initialized resource; on failure all
    /// partial state is torn down before the error is surfaced.
    async fn create(&self) -> Result<Self::Resource, MuxPoolError>;

    /// Whether an idle resource is still usable
    async fn validate(&self, resource: &Self::Resource) -> bool;

    /// Tear a resource down
    ///
    /// Idempotent and infallible; secondary failures are swallowed.
    async fn destroy(&self, resource: &Self::Resource);
}

/// Factory manufacturing [`Connection`]s over a transport
pub struct ConnectionFactory<T: Transport> {
    transport: Arc<T>,
    host: String,
    credentials: Credentials,
    max_channels: usize,
    next_id: AtomicU64,
}

impl<T: Transport> ConnectionFactory<T> {
    /// Create a new connection factory
    pub fn new(
        transport: Arc<T>,
        host: String,
        credentials: Credentials,
        max_channels: usize,
    ) -> Self {
        ConnectionFactory {
            transport,
            host,
            credentials,
            max_channels,
            next_id: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl<T: Transport> ResourceFactory for ConnectionFactory<T> {
    type Resource = Connection<T::Session>;

    async fn create(&self) -> Result<Connection<T::Session>, MuxPoolError> {
        use crate::transport::Session;

        let mut session = self.transport.connect(&self.host).await?;
        if let Err(e) = session.authenticate(&self.credentials).await {
            // Tear the half-open session down so the caller never sees a
            // connected-but-unauthenticated connection.
            session.disconnect().await;
            return Err(e);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!("established connection {} to {}", id, self.host);
        Ok(Connection::new(
            id,
            self.host.clone(),
            session,
            self.max_channels,
        ))
    }

    async fn validate(&self, connection: &Connection<T::Session>) -> bool {
        let alive = connection.is_alive().await;
        if !alive {
            debug!("connection {} failed liveness validation", connection.id());
        }
        alive
    }

    async fn destroy(&self, connection: &Connection<T::Session>) {
        connection.close().await;
    }
}
