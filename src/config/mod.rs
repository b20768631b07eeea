//! Configuration module for Muxpool
//!
//! This module provides configuration types and parsing for the pool
//! manager.

mod manager;
mod pool;

pub use manager::{Config, ManagerConfig};
pub use pool::PoolConfig;

use crate::error::MuxPoolError;
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, MuxPoolError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        MuxPoolError::Config(format!(
            "failed to read config file {:?}: {}",
            path.as_ref(),
            e
        ))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, MuxPoolError> {
    toml::from_str(content)
        .map_err(|e| MuxPoolError::Config(format!("failed to parse configuration: {}", e)))
}
