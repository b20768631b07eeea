//! Error types for Muxpool
//!
//! This module defines all custom error types used throughout the crate.

use std::io;
use thiserror::Error;

/// Main error type for Muxpool operations
#[derive(Error, Debug)]
pub enum MuxPoolError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport error while establishing a session
    #[error("Transport error: {0}")]
    Transport(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Channel open/close error on an otherwise usable connection
    #[error("Channel error: {0}")]
    Channel(String),

    /// Pool exhausted (acquire timed out or non-blocking acquire failed)
    #[error("Pool exhausted: {0}")]
    Exhausted(String),

    /// Pool or manager has been shut down
    #[error("Pool is shut down")]
    Shutdown,
}

impl MuxPoolError {
    /// True if this error indicates the connection itself is unusable
    ///
    /// Channel errors leave the connection usable; transport and auth
    /// failures do not.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(self, MuxPoolError::Transport(_) | MuxPoolError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MuxPoolError::Config("max_idle out of range".to_string());
        assert_eq!(format!("{}", err), "Configuration error: max_idle out of range");

        let err = MuxPoolError::Transport("connection refused".to_string());
        assert_eq!(format!("{}", err), "Transport error: connection refused");

        let err = MuxPoolError::Auth("bad credentials".to_string());
        assert_eq!(format!("{}", err), "Authentication error: bad credentials");

        let err = MuxPoolError::Channel("open failed".to_string());
        assert_eq!(format!("{}", err), "Channel error: open failed");

        let err = MuxPoolError::Exhausted("timed out after 10s".to_string());
        assert_eq!(format!("{}", err), "Pool exhausted: timed out after 10s");

        let err = MuxPoolError::Shutdown;
        assert_eq!(format!("{}", err), "Pool is shut down");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::Other, "io error");
        let err: MuxPoolError = io_err.into();
        assert!(matches!(err, MuxPoolError::Io(_)));
    }

    #[test]
    fn test_is_fatal_to_connection() {
        assert!(MuxPoolError::Transport("x".to_string()).is_fatal_to_connection());
        assert!(MuxPoolError::Auth("x".to_string()).is_fatal_to_connection());
        assert!(!MuxPoolError::Channel("x".to_string()).is_fatal_to_connection());
        assert!(!MuxPoolError::Shutdown.is_fatal_to_connection());
    }
}
