//! Pool configuration
//!
//! Defines the bounds and toggles for the connection pool and the
//! per-connection channel capacity.

use serde::Deserialize;

/// Default maximum number of connections outstanding plus idle
fn default_max_total_connections() -> usize {
    10
}

/// Default channel capacity per connection
fn default_max_channels_per_connection() -> usize {
    10
}

/// Default minimum idle connection count
fn default_min_idle() -> usize {
    1
}

/// Default maximum idle connection count
fn default_max_idle() -> usize {
    3
}

/// Default blocking behavior when the pool is exhausted
fn default_block_when_exhausted() -> bool {
    true
}

/// Default validate-on-borrow behavior
fn default_test_on_borrow() -> bool {
    true
}

/// Default maintenance interval in seconds
fn default_maintenance_interval() -> u64 {
    30
}

/// Connection pool configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections, outstanding and idle combined
    #[serde(default = "default_max_total_connections")]
    pub max_total_connections: usize,

    /// Maximum number of channels hosted by a single connection
    #[serde(default = "default_max_channels_per_connection")]
    pub max_channels_per_connection: usize,

    /// Minimum number of idle connections maintained by the pool
    #[serde(default = "default_min_idle")]
    pub min_idle: usize,

    /// Maximum number of idle connections kept; excess is destroyed on release
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,

    /// Whether `acquire` waits when the pool is exhausted
    ///
    /// When false, acquiring from an exhausted pool fails immediately.
    #[serde(default = "default_block_when_exhausted")]
    pub block_when_exhausted: bool,

    /// Whether idle connections are validated before being handed out
    #[serde(default = "default_test_on_borrow")]
    pub test_on_borrow: bool,

    /// Maximum time to wait for a connection, in seconds
    ///
    /// `None` waits indefinitely, matching the blocking behavior of the
    /// underlying pool primitive.
    #[serde(default)]
    pub acquire_timeout_secs: Option<u64>,

    /// Idle maintenance interval in seconds; 0 disables the background task
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            max_total_connections: default_max_total_connections(),
            max_channels_per_connection: default_max_channels_per_connection(),
            min_idle: default_min_idle(),
            max_idle: default_max_idle(),
            block_when_exhausted: default_block_when_exhausted(),
            test_on_borrow: default_test_on_borrow(),
            acquire_timeout_secs: None,
            maintenance_interval_secs: default_maintenance_interval(),
        }
    }
}

impl PoolConfig {
    /// Validate the pool configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_total_connections == 0 {
            return Err("max_total_connections must be at least 1".to_string());
        }
        if self.max_channels_per_connection == 0 {
            return Err("max_channels_per_connection must be at least 1".to_string());
        }
        if self.min_idle > self.max_idle {
            return Err("min_idle cannot be greater than max_idle".to_string());
        }
        if self.max_idle > self.max_total_connections {
            return Err("max_idle cannot be greater than max_total_connections".to_string());
        }
        if self.acquire_timeout_secs == Some(0) {
            return Err("acquire_timeout_secs must be nonzero when set".to_string());
        }
        Ok(())
    }
}
