//! Physical connection factories

use std::sync::Arc;

use async_trait::async_trait;
use sqlpool_core::{Connection, ConnectionConfig, DatabaseDriver, Result};

/// Factory trait for creating new physical connections
///
/// The pool calls this during initialisation, on growth, and when the
/// validator replaces a dead connection.
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Create a new connection
    async fn create(&self) -> Result<Arc<dyn Connection>>;
}

#[async_trait]
impl<T: ConnectionFactory> ConnectionFactory for Arc<T> {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        (**self).create().await
    }
}

/// Factory that opens connections through a loaded driver
pub struct DriverConnectionFactory {
    driver: Arc<dyn DatabaseDriver>,
    config: ConnectionConfig,
}

impl DriverConnectionFactory {
    pub fn new(driver: Arc<dyn DatabaseDriver>, config: ConnectionConfig) -> Self {
        Self { driver, config }
    }

    /// Get the driver this factory connects through
    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }
}

#[async_trait]
impl ConnectionFactory for DriverConnectionFactory {
    #[tracing::instrument(skip(self), fields(driver = self.driver.id(), url = %self.config.url))]
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        let conn = self.driver.connect(&self.config).await.map_err(|e| {
            tracing::error!(error = %e, "failed to open physical connection");
            e
        })?;
        tracing::debug!("physical connection opened");
        Ok(conn)
    }
}
