//! Connection pool module for Muxpool
//!
//! This module provides two-level pooling: a bounded pool of remote
//! sessions ("connections") and per-connection multiplexing of cheaper
//! sub-resources ("channels").

mod channel;
mod connection;
mod factory;
mod manager;
mod resource_pool;

pub use channel::Channel;
pub use connection::Connection;
pub use factory::{ConnectionFactory, ResourceFactory};
pub use manager::{PoolManager, PoolStats, PoolStatsSnapshot, TransportChannel};
pub use resource_pool::ResourcePool;

use std::fmt;

/// Channel kind indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// File-transfer session
    Transfer,
    /// Command-execution session
    Exec,
    /// File-copy session
    Copy,
}

impl ChannelKind {
    /// Short name used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Transfer => "transfer",
            ChannelKind::Exec => "exec",
            ChannelKind::Copy => "copy",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
