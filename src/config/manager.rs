//! Manager configuration types
//!
//! Defines the target host, the credentials used to authenticate new
//! sessions, and the nested pool configuration.

use super::PoolConfig;
use crate::transport::{Credentials, Secret};
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Pool manager configuration
    pub manager: ManagerConfig,
}

/// Pool manager configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ManagerConfig {
    /// Remote host to open sessions against (e.g., "build-01.example.com:22")
    pub host: String,

    /// Username to authenticate as
    pub username: String,

    /// Secret used to authenticate; redacted from all Debug/log output
    pub secret: Secret,

    /// Connection pool configuration
    #[serde(default)]
    pub pool: PoolConfig,
}

impl ManagerConfig {
    /// Build the credentials handed to the transport on session creation
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.secret.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("host must not be empty".to_string());
        }
        if self.username.is_empty() {
            return Err("username must not be empty".to_string());
        }
        self.pool.validate()
    }
}
