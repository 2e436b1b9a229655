//! Error types for sqlpool

use thiserror::Error;

/// Core error type for sqlpool operations
#[derive(Error, Debug)]
pub enum PoolError {
    /// Missing or insufficient pool configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No handle could be obtained from the pool
    #[error("Pool exhausted: {0}")]
    PoolExhausted(String),

    /// A collaborator failure the pool could not handle locally
    #[error("Connection pool error: {context}")]
    ConnectionPool {
        context: String,
        #[source]
        source: Box<PoolError>,
    },

    /// A handle was returned to a pool that does not own it
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl PoolError {
    /// Wrap a collaborator failure with the operation that triggered it.
    pub fn connection_pool(context: impl Into<String>, source: PoolError) -> Self {
        PoolError::ConnectionPool {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Check if this error reports pool exhaustion
    pub fn is_pool_exhausted(&self) -> bool {
        matches!(self, PoolError::PoolExhausted(_))
    }

    /// Check if this error reports a configuration problem
    pub fn is_configuration(&self) -> bool {
        matches!(self, PoolError::Configuration(_))
    }
}

/// Result type alias for sqlpool operations
pub type Result<T> = std::result::Result<T, PoolError>;
