//! Test utilities and mocks for Muxpool
//!
//! Provides an in-memory transport with controllable failure modes plus a
//! configuration builder, shared across integration tests.

use async_trait::async_trait;
use muxpool::config::{ManagerConfig, PoolConfig};
use muxpool::error::MuxPoolError;
use muxpool::pool::ChannelKind;
use muxpool::transport::{ChannelHandle, Credentials, Secret, Session, Transport};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counters and failure switches shared between a mock transport and the
/// sessions it produces
#[derive(Debug, Default)]
pub struct MockState {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub channels_opened: AtomicUsize,
    pub channels_closed: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_auth: AtomicBool,
    pub fail_open: AtomicBool,
    sessions: Mutex<Vec<Arc<AtomicBool>>>,
}

impl MockState {
    /// Number of sessions ever connected
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Flip the liveness flag of the n-th session, in connect order
    pub fn kill_session(&self, index: usize) {
        if let Some(flag) = self.sessions.lock().unwrap().get(index) {
            flag.store(false, Ordering::SeqCst);
        }
    }

    /// Whether the n-th session still reports itself connected
    pub fn session_alive(&self, index: usize) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .get(index)
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Whether every session ever created is now disconnected
    pub fn all_sessions_dead(&self) -> bool {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .all(|flag| !flag.load(Ordering::SeqCst))
    }
}

/// In-memory transport for exercising the pool without a network
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Arc<MockState> {
        self.state.clone()
    }
}

/// Mock remote session
#[derive(Debug)]
pub struct MockSession {
    state: Arc<MockState>,
    alive: Arc<AtomicBool>,
    authenticated: bool,
}

/// Mock channel handle
#[derive(Debug)]
pub struct MockChannel {
    state: Arc<MockState>,
}

#[async_trait]
impl Transport for MockTransport {
    type Session = MockSession;

    async fn connect(&self, _host: &str) -> Result<MockSession, MuxPoolError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(MuxPoolError::Transport("connection refused".to_string()));
        }
        let alive = Arc::new(AtomicBool::new(true));
        self.state.sessions.lock().unwrap().push(alive.clone());
        Ok(MockSession {
            state: self.state.clone(),
            alive,
            authenticated: false,
        })
    }
}

#[async_trait]
impl Session for MockSession {
    type Channel = MockChannel;

    async fn authenticate(&mut self, _credentials: &Credentials) -> Result<(), MuxPoolError> {
        if self.state.fail_auth.load(Ordering::SeqCst) {
            return Err(MuxPoolError::Auth("bad credentials".to_string()));
        }
        self.authenticated = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn open_channel(&mut self, _kind: ChannelKind) -> Result<MockChannel, MuxPoolError> {
        if self.state.fail_open.load(Ordering::SeqCst) {
            return Err(MuxPoolError::Channel("open rejected".to_string()));
        }
        if !self.alive.load(Ordering::SeqCst) {
            return Err(MuxPoolError::Channel("session closed".to_string()));
        }
        self.state.channels_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockChannel {
            state: self.state.clone(),
        })
    }

    async fn disconnect(&mut self) {
        self.state.disconnects.fetch_add(1, Ordering::SeqCst);
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelHandle for MockChannel {
    async fn close(&mut self) -> Result<(), MuxPoolError> {
        self.state.channels_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Test configuration builder
pub struct TestConfigBuilder {
    host: String,
    username: String,
    max_total_connections: usize,
    max_channels_per_connection: usize,
    min_idle: usize,
    max_idle: usize,
    block_when_exhausted: bool,
    acquire_timeout_secs: Option<u64>,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        TestConfigBuilder {
            host: "mock-host:22".to_string(),
            username: "test-user".to_string(),
            max_total_connections: 10,
            max_channels_per_connection: 10,
            min_idle: 0,
            max_idle: 3,
            block_when_exhausted: true,
            acquire_timeout_secs: None,
        }
    }
}

impl TestConfigBuilder {
    /// Create a new test config builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection capacity
    pub fn max_total_connections(mut self, max: usize) -> Self {
        self.max_total_connections = max;
        if self.max_idle > max {
            self.max_idle = max;
        }
        self
    }

    /// Set the per-connection channel capacity
    pub fn max_channels_per_connection(mut self, max: usize) -> Self {
        self.max_channels_per_connection = max;
        self
    }

    /// Set the idle bounds
    pub fn idle_bounds(mut self, min: usize, max: usize) -> Self {
        self.min_idle = min;
        self.max_idle = max;
        self
    }

    /// Set whether acquire waits on exhaustion
    pub fn block_when_exhausted(mut self, block: bool) -> Self {
        self.block_when_exhausted = block;
        self
    }

    /// Set the acquire timeout in seconds
    pub fn acquire_timeout_secs(mut self, secs: u64) -> Self {
        self.acquire_timeout_secs = Some(secs);
        self
    }

    /// Build the manager configuration
    ///
    /// The background maintenance task is disabled so tests control every
    /// pool transition themselves.
    pub fn build(self) -> ManagerConfig {
        ManagerConfig {
            host: self.host,
            username: self.username,
            secret: Secret::new("test-secret"),
            pool: PoolConfig {
                max_total_connections: self.max_total_connections,
                max_channels_per_connection: self.max_channels_per_connection,
                min_idle: self.min_idle,
                max_idle: self.max_idle,
                block_when_exhausted: self.block_when_exhausted,
                test_on_borrow: true,
                acquire_timeout_secs: self.acquire_timeout_secs,
                maintenance_interval_secs: 0,
            },
        }
    }
}
