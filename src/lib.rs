//! # Muxpool - Two-Level Connection and Channel Pooling
//!
//! Muxpool manages a bounded set of expensive, long-lived remote sessions
//! ("connections") and multiplexes a bounded number of cheaper
//! sub-resources ("channels": file-transfer, command-execution, and
//! file-copy sessions) within each connection. Callers borrow a channel
//! of a given kind without knowing whether a new connection had to be
//! opened or an existing one was reused.
//!
//! ## Features
//!
//! - **Bounded connection pool**: blocking acquisition with optional
//!   timeout, validate-on-borrow, and idle maintenance
//! - **Channel multiplexing**: per-connection channel capacity with
//!   reuse of checked-out connections before new ones are opened
//! - **Transport-agnostic**: the remote protocol lives behind the
//!   [`transport::Transport`] trait; the pool only needs connect,
//!   authenticate, liveness, open-channel, and disconnect
//! - **Scoped borrowing**: `with_*` helpers that return the channel on
//!   every exit path
//!
//! ## Usage
//!
//! ```rust,ignore
//! use muxpool::config::load_config;
//! use muxpool::pool::PoolManager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), muxpool::MuxPoolError> {
//!     let config = load_config("muxpool.toml")?;
//!     let manager = PoolManager::new(config.manager, MyTransport::new()).await?;
//!
//!     let (conn, channel) = manager.borrow_transfer().await?;
//!     // ... drive the channel's data plane ...
//!     manager.give_back(&conn, channel).await;
//!
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! A borrow request flows through the manager's checked-out set first
//! (reusing a connection with spare channel capacity) and falls back to
//! the bounded pool, which either hands out a validated idle connection
//! or manufactures a new one through the factory:
//!
//! ```text
//! borrow -> checked-out scan -> Connection::open_channel
//!                -> (full) -> ResourcePool::acquire -> factory -> open_channel
//! ```
//!
//! A connection re-enters the pool exactly when its last channel is
//! released.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod pool;
pub mod transport;

// Re-export commonly used items
pub use config::{load_config, Config};
pub use error::MuxPoolError;
pub use pool::{Channel, ChannelKind, Connection, PoolManager};

/// Version of the Muxpool library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the library
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "muxpool");
    }
}
