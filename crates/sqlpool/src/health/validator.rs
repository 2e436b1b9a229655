//! Liveness checking with in-place replacement

use std::sync::Arc;
use std::time::Duration;

use sqlpool_core::{Connection, PoolError, Result};

use crate::factory::ConnectionFactory;
use crate::pool::PoolConfig;

/// Validates pooled connections and replaces dead ones.
///
/// Validation is disabled when no validation query is configured; every
/// check is then a no-op.
#[derive(Debug, Clone)]
pub struct Validator {
    query: Option<String>,
    timeout: Duration,
}

impl Validator {
    /// Create a validator. A blank query disables validation.
    pub fn new(query: Option<String>, timeout: Duration) -> Self {
        let query = query.filter(|q| !q.trim().is_empty());
        Self { query, timeout }
    }

    /// Create a validator from the pool's validation settings.
    pub fn from_config(config: &PoolConfig) -> Self {
        Self::new(
            config.validation_query().map(str::to_string),
            config.validation_timeout(),
        )
    }

    /// Whether a validation query is configured
    pub fn is_enabled(&self) -> bool {
        self.query.is_some()
    }

    /// Get the validation query, if any
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Get the liveness check timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Check a connection, replacing it in place when it is dead.
    ///
    /// Returns `true` when the connection was replaced. Failures of the
    /// liveness probe or of the replacement are wrapped as
    /// [`PoolError::ConnectionPool`]; there is no retry.
    pub async fn check(
        &self,
        connection: &mut Arc<dyn Connection>,
        factory: &dyn ConnectionFactory,
    ) -> Result<bool> {
        let Some(query) = self.query.as_deref() else {
            return Ok(false);
        };

        let alive = connection
            .is_valid(query, self.timeout)
            .await
            .map_err(|e| PoolError::connection_pool("liveness check failed", e))?;
        if alive {
            return Ok(false);
        }

        tracing::warn!(
            driver = connection.driver_name(),
            "pooled connection is no longer valid, replacing it"
        );
        let fresh = factory
            .create()
            .await
            .map_err(|e| PoolError::connection_pool("failed to replace invalid connection", e))?;

        let stale = std::mem::replace(connection, fresh);
        if let Err(e) = stale.close().await {
            tracing::debug!(error = %e, "closing replaced connection failed");
        }
        Ok(true)
    }
}
