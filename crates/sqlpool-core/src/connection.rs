//! Connection trait and liveness checking

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;
use std::time::Duration;

/// A physical database connection
///
/// Implementations are owned by the pool while idle and lent to callers
/// through a pooled handle. The pool never inspects the session beyond
/// `is_valid` and `close`.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "sqlite", "postgres")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data (INSERT/UPDATE/DELETE)
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows (SELECT)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Close the connection
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;

    /// Report whether the connection is still usable.
    ///
    /// The default implementation treats a closed connection as dead, and
    /// otherwise runs `validation_query` bounded by `timeout`. A failed or
    /// timed out query reports `false`. Drivers with a native liveness probe
    /// should override this; an `Err` means the probe itself could not run.
    async fn is_valid(&self, validation_query: &str, timeout: Duration) -> Result<bool> {
        if self.is_closed() {
            return Ok(false);
        }

        match tokio::time::timeout(timeout, self.query(validation_query, &[])).await {
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => {
                tracing::debug!(
                    driver = self.driver_name(),
                    error = %e,
                    "validation query failed"
                );
                Ok(false)
            }
            Err(_) => {
                tracing::debug!(
                    driver = self.driver_name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "validation query timed out"
                );
                Ok(false)
            }
        }
    }
}
