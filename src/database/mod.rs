// Database module
// Connection manager with health checking plus the read queries behind each tool

pub mod manager;
pub mod models;
pub mod queries;

pub use manager::{ConnectionManager, DatabaseState};
pub use models::{PlayerRecord, SupplyDetail, SupplyRecord, SupplyStatus, TableCounts};

use crate::config::ConfigError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database configuration rejected: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Database is not connected")]
    Disconnected,

    #[error("Connection manager has been shut down")]
    ShutDown,

    #[error("'{operation}' did not finish within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Query '{operation}' failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl DatabaseError {
    /// Whether the error came from the connection rather than the statement
    #[inline]
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            DatabaseError::Connect(_)
                | DatabaseError::Disconnected
                | DatabaseError::ShutDown
                | DatabaseError::Timeout { .. }
        )
    }
}
