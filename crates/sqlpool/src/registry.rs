//! Driver registry for resolving the driver a pool connects through

use std::collections::HashMap;
use std::sync::Arc;
use sqlpool_core::{DatabaseDriver, PoolError, Result};

/// Registry of available database drivers
///
/// Registration order is kept so that url-based inference is deterministic.
#[derive(Clone)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn DatabaseDriver>>,
    order: Vec<String>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(sqlpool_driver_sqlite::SqliteDriver::new()));

        registry
    }

    /// Register a new driver, replacing any driver with the same id
    pub fn register(&mut self, driver: Arc<dyn DatabaseDriver>) {
        let id = driver.id().to_string();
        tracing::info!(driver = %id, "registering database driver");
        if self.drivers.insert(id.clone(), driver).is_none() {
            self.order.push(id);
        }
    }

    /// Get a driver by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn DatabaseDriver>> {
        self.drivers.get(id).cloned()
    }

    /// List all registered driver ids in registration order
    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }

    /// Load the driver for a pool's connection target.
    ///
    /// A non-blank `driver` must be registered and must accept `url`. A blank
    /// `driver` is inferred from `url`.
    #[tracing::instrument(skip(self))]
    pub fn load(&self, driver: &str, url: &str) -> Result<Arc<dyn DatabaseDriver>> {
        let driver = driver.trim();
        let url = url.trim();

        if driver.is_empty() {
            return self
                .order
                .iter()
                .filter_map(|id| self.drivers.get(id))
                .find(|d| d.accepts_url(url))
                .cloned()
                .ok_or_else(|| {
                    tracing::warn!("no registered driver accepts url");
                    PoolError::Driver(format!("No registered driver accepts url '{}'", url))
                });
        }

        let loaded = self.get(driver).ok_or_else(|| {
            tracing::warn!("driver not found in registry");
            PoolError::Driver(format!("Unknown driver: {}", driver))
        })?;

        if !url.is_empty() && !loaded.accepts_url(url) {
            return Err(PoolError::Driver(format!(
                "Driver '{}' does not accept url '{}'",
                driver, url
            )));
        }

        Ok(loaded)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
