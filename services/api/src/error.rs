//! services/api/src/error.rs
//!
//! Startup failures of the QuickScan backend. Request failures never reach
//! this type; handlers answer them with an `ErrorBody`.

use crate::config::ConfigError;
use quickscan_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A scan history or extraction port failed outside a request.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Opening the SQLite pool failed.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding or serving the listener failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
