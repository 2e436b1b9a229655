//! Database driver trait definition

use crate::{Connection, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core driver trait that all database drivers must implement
///
/// A driver is the physical connection factory the pool consumes: given a
/// `ConnectionConfig`, it produces a live `Connection` or fails.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres", "sqlite")
    fn id(&self) -> &'static str;

    /// Human-readable name (e.g., "PostgreSQL", "SQLite")
    fn display_name(&self) -> &'static str {
        self.id()
    }

    /// Whether this driver understands the given connection target.
    ///
    /// Used to infer the driver when a configuration only names a url.
    fn accepts_url(&self, url: &str) -> bool;

    /// Create a new connection
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>>;
}

/// Everything a driver needs to open one physical connection
#[derive(Clone, Default)]
pub struct ConnectionConfig {
    /// Driver ID (e.g., "postgres", "sqlite")
    pub driver: String,
    /// Connection target (url, path, or driver-specific address)
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Additional driver-specific parameters
    pub params: HashMap<String, String>,
}

impl ConnectionConfig {
    pub fn new(driver: &str, url: &str) -> Self {
        Self {
            driver: driver.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    pub fn with_credentials(mut self, user: Option<String>, password: Option<String>) -> Self {
        self.user = user;
        self.password = password;
        self
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// Get a parameter by key
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.as_str())
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("params", &self.params)
            .finish()
    }
}
