//! Generic bounded resource pool
//!
//! Manages idle and outstanding instances of a pooled resource with
//! blocking acquisition, validate-on-borrow, and idle maintenance.

use super::factory::ResourceFactory;
use super::manager::PoolStats;
use crate::config::PoolConfig;
use crate::error::MuxPoolError;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

/// Bookkeeping guarded by the pool's single critical section
struct PoolState<R> {
    /// Instances not currently checked out, oldest first
    idle: VecDeque<Arc<R>>,
    /// Number of instances currently checked out
    outstanding: usize,
    /// Whether the pool has been closed
    closed: bool,
}

/// What the acquire loop decided to do for one iteration
enum Acquire<R> {
    Idle(Arc<R>),
    Create,
    Wait,
}

/// Generic bounded pool over a [`ResourceFactory`]
///
/// Invariant: `outstanding + idle.len() <= max_total` at every instant.
/// The pool never invokes factory methods while holding its own lock, so
/// a resource's internal locking can never deadlock against the pool's
/// bookkeeping.
pub struct ResourcePool<F: ResourceFactory> {
    factory: F,
    max_total: usize,
    max_idle: usize,
    min_idle: usize,
    test_on_borrow: bool,
    block_when_exhausted: bool,
    acquire_timeout: Option<Duration>,
    state: Mutex<PoolState<F::Resource>>,
    /// Signalled whenever capacity may have been freed
    available: Notify,
    stats: Arc<PoolStats>,
}

impl<F: ResourceFactory> ResourcePool<F> {
    /// Create a new pool
    pub fn new(factory: F, config: &PoolConfig, stats: Arc<PoolStats>) -> Self {
        ResourcePool {
            factory,
            max_total: config.max_total_connections,
            max_idle: config.max_idle,
            min_idle: config.min_idle,
            test_on_borrow: config.test_on_borrow,
            block_when_exhausted: config.block_when_exhausted,
            acquire_timeout: config.acquire_timeout_secs.map(Duration::from_secs),
            state: Mutex::new(PoolState {
                idle: VecDeque::new(),
                outstanding: 0,
                closed: false,
            }),
            available: Notify::new(),
            stats,
        }
    }

    /// Acquire a resource, creating one if the pool is below capacity
    ///
    /// Suspends the calling task while the pool is exhausted, unless
    /// `block_when_exhausted` is off or the configured acquire timeout
    /// elapses, in which case the call fails with
    /// [`MuxPoolError::Exhausted`]. Idle resources are validated before
    /// being handed out; invalid ones are destroyed and the acquisition
    /// retried.
    pub async fn acquire(&self) -> Result<Arc<F::Resource>, MuxPoolError> {
        let deadline = self
            .acquire_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);

        loop {
            let action = {
                let mut state = self.state.lock().await;
                if state.closed {
                    drop(state);
                    // Cascade so every queued waiter observes the closure.
                    self.available.notify_one();
                    return Err(MuxPoolError::Shutdown);
                }

                if let Some(resource) = state.idle.pop_front() {
                    state.outstanding += 1;
                    self.stats.set_idle_count(state.idle.len());
                    self.stats.set_outstanding_count(state.outstanding);
                    if !state.idle.is_empty() {
                        // Chain the wake-up: Notify holds a single permit,
                        // so concurrent releases can collapse into one.
                        self.available.notify_one();
                    }
                    Acquire::Idle(resource)
                } else if state.outstanding < self.max_total {
                    state.outstanding += 1;
                    self.stats.set_outstanding_count(state.outstanding);
                    Acquire::Create
                } else if !self.block_when_exhausted {
                    return Err(MuxPoolError::Exhausted(
                        "pool is at capacity and blocking is disabled".to_string(),
                    ));
                } else {
                    Acquire::Wait
                }
            };

            match action {
                Acquire::Idle(resource) => {
                    if self.test_on_borrow && !self.factory.validate(&resource).await {
                        debug!("destroying idle resource that failed validation");
                        self.factory.destroy(&resource).await;
                        self.stats.record_evicted();
                        self.stats.record_destroyed();
                        self.forfeit_slot().await;
                        continue;
                    }
                    return Ok(resource);
                }
                Acquire::Create => match self.factory.create().await {
                    Ok(resource) => {
                        self.stats.record_created();
                        return Ok(Arc::new(resource));
                    }
                    Err(e) => {
                        self.forfeit_slot().await;
                        return Err(e);
                    }
                },
                Acquire::Wait => {
                    let notified = self.available.notified();
                    match deadline {
                        Some(deadline) => {
                            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                                return Err(MuxPoolError::Exhausted(
                                    "timed out waiting for a pooled connection".to_string(),
                                ));
                            }
                        }
                        None => notified.await,
                    }
                }
            }
        }
    }

    /// Return a resource to the pool
    ///
    /// The resource re-enters the idle set unless the pool is closed or
    /// the idle set is at `max_idle`, in which case it is destroyed. The
    /// caller must only release resources that host no sub-resources.
    pub async fn release(&self, resource: Arc<F::Resource>) {
        let destroy = {
            let mut state = self.state.lock().await;
            state.outstanding = state.outstanding.saturating_sub(1);
            self.stats.set_outstanding_count(state.outstanding);
            if state.closed || state.idle.len() >= self.max_idle {
                true
            } else {
                state.idle.push_back(resource.clone());
                self.stats.set_idle_count(state.idle.len());
                false
            }
        };

        if destroy {
            debug!("destroying released resource (pool closed or idle set full)");
            self.factory.destroy(&resource).await;
            self.stats.record_destroyed();
        }
        self.available.notify_one();
    }

    /// Close the pool
    ///
    /// Destroys every idle resource and fails all later acquisitions.
    /// Outstanding resources are not recalled; their owner remains
    /// responsible for them.
    pub async fn close(&self) {
        let drained = {
            let mut state = self.state.lock().await;
            state.closed = true;
            self.stats.set_idle_count(0);
            std::mem::take(&mut state.idle)
        };

        for resource in drained {
            self.factory.destroy(&resource).await;
            self.stats.record_destroyed();
        }

        self.available.notify_waiters();
        self.available.notify_one();
    }

    /// Run one maintenance pass
    ///
    /// Validates idle resources, destroys the dead ones, and tops the
    /// idle set back up to `min_idle` without exceeding the total bound.
    pub async fn maintain(&self) {
        let idles = {
            let mut state = self.state.lock().await;
            if state.closed {
                return;
            }
            std::mem::take(&mut state.idle)
        };

        let mut kept = Vec::with_capacity(idles.len());
        let mut evicted = 0usize;
        for resource in idles {
            if self.factory.validate(&resource).await {
                kept.push(resource);
            } else {
                self.factory.destroy(&resource).await;
                self.stats.record_evicted();
                self.stats.record_destroyed();
                evicted += 1;
            }
        }

        let leftovers = {
            let mut state = self.state.lock().await;
            if state.closed {
                kept
            } else {
                for resource in kept.drain(..) {
                    state.idle.push_back(resource);
                }
                self.stats.set_idle_count(state.idle.len());
                Vec::new()
            }
        };
        // The pool closed while we were validating; nothing may re-enter.
        for resource in leftovers {
            self.factory.destroy(&resource).await;
            self.stats.record_destroyed();
        }

        if evicted > 0 {
            debug!("evicted {} dead idle resources", evicted);
            self.available.notify_one();
        }

        self.replenish().await;
    }

    /// Top the idle set up to `min_idle`
    async fn replenish(&self) {
        loop {
            let should_create = {
                let mut state = self.state.lock().await;
                if state.closed
                    || state.idle.len() >= self.min_idle
                    || state.outstanding + state.idle.len() >= self.max_total
                {
                    false
                } else {
                    // Reserve a slot so concurrent acquires cannot
                    // overshoot the total bound while we create.
                    state.outstanding += 1;
                    true
                }
            };
            if !should_create {
                return;
            }

            match self.factory.create().await {
                Ok(resource) => {
                    self.stats.record_created();
                    let resource = Arc::new(resource);
                    let stale = {
                        let mut state = self.state.lock().await;
                        state.outstanding = state.outstanding.saturating_sub(1);
                        if state.closed {
                            true
                        } else {
                            state.idle.push_back(resource.clone());
                            self.stats.set_idle_count(state.idle.len());
                            self.stats.set_outstanding_count(state.outstanding);
                            false
                        }
                    };
                    if stale {
                        // The pool closed while we were creating.
                        self.factory.destroy(&resource).await;
                        self.stats.record_destroyed();
                        return;
                    }
                    self.available.notify_one();
                }
                Err(e) => {
                    warn!("failed to replenish idle resource: {}", e);
                    self.forfeit_slot().await;
                    return;
                }
            }
        }
    }

    /// Give up a reserved slot after a failed create or eviction
    async fn forfeit_slot(&self) {
        {
            let mut state = self.state.lock().await;
            state.outstanding = state.outstanding.saturating_sub(1);
            self.stats.set_outstanding_count(state.outstanding);
        }
        self.available.notify_one();
    }

    /// Number of idle resources
    pub async fn idle_count(&self) -> usize {
        self.state.lock().await.idle.len()
    }

    /// Number of resources currently checked out
    pub async fn outstanding_count(&self) -> usize {
        self.state.lock().await.outstanding
    }

    /// Whether the pool has been closed
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.closed
    }
}
