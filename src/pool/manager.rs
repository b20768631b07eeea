//! Pool manager facade
//!
//! Coordinates channel-level borrowing across the bounded connection
//! pool: reuse of checked-out connections with spare channel capacity,
//! acquisition of new connections, return ordering, statistics, and
//! shutdown.

use super::channel::Channel;
use super::connection::Connection;
use super::factory::ConnectionFactory;
use super::resource_pool::ResourcePool;
use super::ChannelKind;
use crate::config::ManagerConfig;
use crate::error::MuxPoolError;
use crate::transport::{Session, Transport};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info};

/// Channel handle type produced by a transport's sessions
pub type TransportChannel<T> = <<T as Transport>::Session as Session>::Channel;

/// Statistics for the connection pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Total connections established
    pub connections_created: AtomicUsize,
    /// Total connections destroyed
    pub connections_destroyed: AtomicUsize,
    /// Connections destroyed because they failed liveness validation
    pub connections_evicted: AtomicUsize,
    /// Connections currently idle in the pool
    pub idle_count: AtomicUsize,
    /// Connections currently checked out of the pool
    pub outstanding_count: AtomicUsize,
    /// Channels currently out with borrowers
    pub channels_open: AtomicUsize,
    /// Total channel borrows served
    pub total_borrows: AtomicUsize,
    /// Borrows served by reusing an already-checked-out connection
    pub reuse_borrows: AtomicUsize,
    /// Total channels returned
    pub total_returns: AtomicUsize,
}

impl PoolStats {
    /// Create new pool stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection creation
    pub fn record_created(&self) {
        self.connections_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection destruction
    pub fn record_destroyed(&self) {
        self.connections_destroyed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an eviction after failed validation
    pub fn record_evicted(&self) {
        self.connections_evicted.fetch_add(1, Ordering::Relaxed);
    }

    /// Update the idle-connection gauge
    pub fn set_idle_count(&self, count: usize) {
        self.idle_count.store(count, Ordering::Relaxed);
    }

    /// Update the outstanding-connection gauge
    pub fn set_outstanding_count(&self, count: usize) {
        self.outstanding_count.store(count, Ordering::Relaxed);
    }

    /// Record a served channel borrow
    pub fn record_borrow(&self, reused: bool) {
        self.total_borrows.fetch_add(1, Ordering::Relaxed);
        if reused {
            self.reuse_borrows.fetch_add(1, Ordering::Relaxed);
        }
        self.channels_open.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a channel return
    pub fn record_return(&self) {
        self.total_returns.fetch_add(1, Ordering::Relaxed);
        let _ = self
            .channels_open
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                n.checked_sub(1)
            });
    }

    /// Get a current stats snapshot
    pub fn snapshot(&self) -> PoolStatsSnapshot {
        PoolStatsSnapshot {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_destroyed: self.connections_destroyed.load(Ordering::Relaxed),
            connections_evicted: self.connections_evicted.load(Ordering::Relaxed),
            idle_count: self.idle_count.load(Ordering::Relaxed),
            outstanding_count: self.outstanding_count.load(Ordering::Relaxed),
            channels_open: self.channels_open.load(Ordering::Relaxed),
            total_borrows: self.total_borrows.load(Ordering::Relaxed),
            reuse_borrows: self.reuse_borrows.load(Ordering::Relaxed),
            total_returns: self.total_returns.load(Ordering::Relaxed),
        }
    }

    /// Log pool health at debug level
    pub fn log_health(&self) {
        let s = self.snapshot();
        debug!(
            "pool health: created={}, destroyed={}, evicted={}, idle={}, outstanding={}, channels={}, borrows={} ({} reused), returns={}",
            s.connections_created,
            s.connections_destroyed,
            s.connections_evicted,
            s.idle_count,
            s.outstanding_count,
            s.channels_open,
            s.total_borrows,
            s.reuse_borrows,
            s.total_returns
        );
    }
}

/// Snapshot of pool statistics
#[derive(Debug, Clone)]
pub struct PoolStatsSnapshot {
    /// Total connections established
    pub connections_created: usize,
    /// Total connections destroyed
    pub connections_destroyed: usize,
    /// Connections destroyed after failed validation
    pub connections_evicted: usize,
    /// Connections currently idle
    pub idle_count: usize,
    /// Connections currently checked out
    pub outstanding_count: usize,
    /// Channels currently out with borrowers
    pub channels_open: usize,
    /// Total channel borrows served
    pub total_borrows: usize,
    /// Borrows served by connection reuse
    pub reuse_borrows: usize,
    /// Total channels returned
    pub total_returns: usize,
}

/// Pool manager facade, one instance per target host and credential set
///
/// Borrowing a channel first tries to reuse a connection this manager
/// already has checked out that still has spare channel capacity; only
/// when none exists (or a race filled the chosen one) is a connection
/// acquired from the bounded pool.
pub struct PoolManager<T: Transport> {
    config: ManagerConfig,
    pool: ResourcePool<ConnectionFactory<T>>,
    /// Connections currently borrowed from the pool, insertion order
    checked_out: Mutex<Vec<Arc<Connection<T::Session>>>>,
    stats: Arc<PoolStats>,
    shutdown_notify: Notify,
    is_shutdown: AtomicBool,
}

impl<T: Transport> PoolManager<T> {
    /// Create a new pool manager
    ///
    /// Fails fast with [`MuxPoolError::Config`] on invalid bounds. When
    /// `min_idle` is nonzero an initial maintenance pass pre-establishes
    /// idle connections (failures are logged and retried by the next
    /// pass). A background maintenance task is spawned unless
    /// `maintenance_interval_secs` is 0.
    pub async fn new(config: ManagerConfig, transport: T) -> Result<Arc<Self>, MuxPoolError> {
        config.validate().map_err(MuxPoolError::Config)?;

        let stats = Arc::new(PoolStats::new());
        let factory = ConnectionFactory::new(
            Arc::new(transport),
            config.host.clone(),
            config.credentials(),
            config.pool.max_channels_per_connection,
        );
        let pool = ResourcePool::new(factory, &config.pool, stats.clone());

        let manager = Arc::new(PoolManager {
            pool,
            checked_out: Mutex::new(Vec::new()),
            stats,
            shutdown_notify: Notify::new(),
            is_shutdown: AtomicBool::new(false),
            config,
        });

        if manager.config.pool.min_idle > 0 {
            manager.pool.maintain().await;
        }

        if manager.config.pool.maintenance_interval_secs > 0 {
            let task = manager.clone();
            tokio::spawn(async move {
                task.run_maintenance().await;
            });
        }

        Ok(manager)
    }

    /// Borrow a file-transfer channel
    ///
    /// Reuses the first alive, non-full checked-out connection in
    /// insertion order; otherwise acquires a connection from the pool.
    pub async fn borrow_transfer(
        &self,
    ) -> Result<(Arc<Connection<T::Session>>, Channel<TransportChannel<T>>), MuxPoolError> {
        self.borrow_channel(ChannelKind::Transfer).await
    }

    /// Borrow a command-execution channel
    pub async fn borrow_exec(
        &self,
    ) -> Result<(Arc<Connection<T::Session>>, Channel<TransportChannel<T>>), MuxPoolError> {
        self.borrow_channel(ChannelKind::Exec).await
    }

    /// Borrow a file-copy channel
    pub async fn borrow_copy(
        &self,
    ) -> Result<(Arc<Connection<T::Session>>, Channel<TransportChannel<T>>), MuxPoolError> {
        self.borrow_channel(ChannelKind::Copy).await
    }

    /// Return a borrowed channel
    ///
    /// Always succeeds; close failures are logged and swallowed. When the
    /// last channel of a connection is released, the connection leaves
    /// the checked-out set and re-enters the pool.
    pub async fn give_back(
        &self,
        connection: &Arc<Connection<T::Session>>,
        channel: Channel<TransportChannel<T>>,
    ) {
        self.stats.record_return();
        if connection.release_channel(channel).await {
            self.remove_checked_out(connection.id()).await;
            self.pool.release(connection.clone()).await;
            debug!("returned connection {} to the pool", connection.id());
        }
    }

    /// Borrow a transfer channel, run `action` on it, and return it
    ///
    /// The channel is returned on every exit path; if `action` fails, its
    /// error is re-raised after the release has completed.
    pub async fn with_transfer<R, F>(&self, action: F) -> Result<R, MuxPoolError>
    where
        F: for<'c> FnOnce(
            &'c mut Channel<TransportChannel<T>>,
        ) -> BoxFuture<'c, Result<R, MuxPoolError>>,
    {
        self.with_channel(ChannelKind::Transfer, action).await
    }

    /// Borrow an exec channel, run `action` on it, and return it
    pub async fn with_exec<R, F>(&self, action: F) -> Result<R, MuxPoolError>
    where
        F: for<'c> FnOnce(
            &'c mut Channel<TransportChannel<T>>,
        ) -> BoxFuture<'c, Result<R, MuxPoolError>>,
    {
        self.with_channel(ChannelKind::Exec, action).await
    }

    /// Borrow a copy channel, run `action` on it, and return it
    pub async fn with_copy<R, F>(&self, action: F) -> Result<R, MuxPoolError>
    where
        F: for<'c> FnOnce(
            &'c mut Channel<TransportChannel<T>>,
        ) -> BoxFuture<'c, Result<R, MuxPoolError>>,
    {
        self.with_channel(ChannelKind::Copy, action).await
    }

    /// Shut the manager down
    ///
    /// Force-closes every checked-out connection (best-effort), clears
    /// the checked-out set, and closes the pool. Idempotent; later
    /// borrows fail with [`MuxPoolError::Shutdown`].
    pub async fn shutdown(&self) {
        if self.is_shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutting down pool manager for {}", self.config.host);
        self.shutdown_notify.notify_waiters();

        let drained: Vec<_> = {
            let mut checked_out = self.checked_out.lock().await;
            std::mem::take(&mut *checked_out)
        };
        for connection in drained {
            connection.close().await;
        }

        self.pool.close().await;
    }

    /// Whether the manager has been shut down
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Pool statistics
    pub fn stats(&self) -> &Arc<PoolStats> {
        &self.stats
    }

    /// Number of connections currently checked out by this manager
    pub async fn checked_out_count(&self) -> usize {
        self.checked_out.lock().await.len()
    }

    /// Number of connections idle in the pool
    pub async fn idle_count(&self) -> usize {
        self.pool.idle_count().await
    }

    async fn borrow_channel(
        &self,
        kind: ChannelKind,
    ) -> Result<(Arc<Connection<T::Session>>, Channel<TransportChannel<T>>), MuxPoolError> {
        if self.is_shutdown() {
            return Err(MuxPoolError::Shutdown);
        }

        // Reuse scan over a snapshot: other tasks may add or remove
        // members while we probe liveness.
        let snapshot: Vec<_> = self.checked_out.lock().await.to_vec();
        let mut candidate = None;
        for connection in snapshot {
            if connection.is_alive().await && !connection.is_full().await {
                candidate = Some(connection);
                break;
            }
        }

        if let Some(connection) = candidate {
            // A racing borrower may have filled the connection between
            // the scan and this call; Ok(None) falls through to the pool.
            if let Some(channel) = connection.open_channel(kind).await? {
                self.stats.record_borrow(true);
                debug!(
                    "reusing connection {} for {} channel",
                    connection.id(),
                    kind
                );
                return Ok((connection, channel));
            }
        }

        let connection = self.pool.acquire().await?;
        connection.unpark().await;
        self.checked_out.lock().await.push(connection.clone());

        match connection.open_channel(kind).await {
            Ok(Some(channel)) => {
                self.stats.record_borrow(false);
                debug!(
                    "checked out connection {} for {} channel",
                    connection.id(),
                    kind
                );
                Ok((connection, channel))
            }
            Ok(None) => {
                // A fresh connection can only report "full" when the
                // channel capacity is below 1, which construction rejects.
                self.retire(&connection).await;
                Err(MuxPoolError::Config(
                    "max_channels_per_connection must be at least 1".to_string(),
                ))
            }
            Err(e) => {
                self.retire(&connection).await;
                Err(e)
            }
        }
    }

    /// Hand a zero-channel connection back to the pool after a failed
    /// first borrow
    async fn retire(&self, connection: &Arc<Connection<T::Session>>) {
        self.remove_checked_out(connection.id()).await;
        if connection.park_if_empty().await {
            self.pool.release(connection.clone()).await;
        }
    }

    async fn remove_checked_out(&self, id: u64) {
        let mut checked_out = self.checked_out.lock().await;
        if let Some(pos) = checked_out.iter().position(|c| c.id() == id) {
            checked_out.remove(pos);
        }
    }

    async fn with_channel<R, F>(&self, kind: ChannelKind, action: F) -> Result<R, MuxPoolError>
    where
        F: for<'c> FnOnce(
            &'c mut Channel<TransportChannel<T>>,
        ) -> BoxFuture<'c, Result<R, MuxPoolError>>,
    {
        let (connection, mut channel) = self.borrow_channel(kind).await?;
        let result = action(&mut channel).await;
        self.give_back(&connection, channel).await;
        result
    }

    async fn run_maintenance(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.pool.maintenance_interval_secs);
        loop {
            if self.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = self.shutdown_notify.notified() => {
                    debug!("pool maintenance stopping");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    self.pool.maintain().await;
                    self.stats.log_health();
                }
            }
        }
    }
}
