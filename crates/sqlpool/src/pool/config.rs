//! Pool configuration types

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlpool_core::{ConnectionConfig, PoolError, Result};

/// Configuration for a connection pool
///
/// Names the connection target and controls pool sizing, waiting and
/// validation. Immutable once handed to a pool.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Driver identifier (e.g. "sqlite"); inferred from `url` when blank
    driver: String,
    /// Connection target
    url: String,
    user: Option<String>,
    password: Option<String>,
    /// Number of connections created when the pool is initialised
    min_size: usize,
    /// Maximum number of connections the pool will ever hold
    max_size: usize,
    /// How long acquire may wait for a free connection; `<= 0` fails fast
    max_wait_ms: i64,
    /// Validate a connection before handing it out
    test_on_borrow: bool,
    /// Validate a connection when it is returned
    test_on_return: bool,
    /// Query used to validate connections; enables the idle check
    validation_query: Option<String>,
    /// Period of the idle check in seconds
    idle_check_interval_secs: u64,
    /// Timeout of a single liveness check in seconds
    validation_timeout_secs: u64,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// # Panics
    ///
    /// Panics if `min_size > max_size` or if `max_size` is 0.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        assert!(
            max_size > 0,
            "max_size must be greater than 0, got {}",
            max_size
        );
        assert!(
            min_size <= max_size,
            "min_size ({}) cannot exceed max_size ({})",
            min_size,
            max_size
        );

        Self {
            driver: String::new(),
            url: String::new(),
            user: None,
            password: None,
            min_size,
            max_size,
            max_wait_ms: 5_000,
            test_on_borrow: false,
            test_on_return: false,
            validation_query: None,
            idle_check_interval_secs: 60,
            validation_timeout_secs: 5,
        }
    }

    /// Set the driver identifier
    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    /// Set the connection target
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the credentials passed to the driver
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Set the maximum wait in milliseconds (`<= 0` disables waiting)
    pub fn with_max_wait_ms(mut self, max_wait_ms: i64) -> Self {
        self.max_wait_ms = max_wait_ms;
        self
    }

    pub fn with_test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    pub fn with_test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = enabled;
        self
    }

    /// Set the validation query, enabling validation and the idle check
    pub fn with_validation_query(mut self, query: impl Into<String>) -> Self {
        self.validation_query = Some(query.into());
        self
    }

    pub fn with_idle_check_interval_secs(mut self, secs: u64) -> Self {
        self.idle_check_interval_secs = secs;
        self
    }

    pub fn with_validation_timeout_secs(mut self, secs: u64) -> Self {
        self.validation_timeout_secs = secs;
        self
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| PoolError::Configuration(format!("Invalid TOML pool config: {}", e)))
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| PoolError::Configuration(format!("Invalid JSON pool config: {}", e)))
    }

    /// Load a configuration file, choosing the format by extension
    /// (`.json` is JSON, anything else is TOML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PoolError::Configuration(format!(
                "Failed to read pool config {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Check that the configuration is complete and consistent
    pub fn validate(&self) -> Result<()> {
        if self.driver.trim().is_empty() && self.url.trim().is_empty() {
            return Err(PoolError::Configuration(
                "data source config is missing both driver and url".into(),
            ));
        }
        if self.max_size == 0 {
            return Err(PoolError::Configuration(
                "max_size must be greater than 0".into(),
            ));
        }
        if self.min_size > self.max_size {
            return Err(PoolError::Configuration(format!(
                "min_size ({}) cannot exceed max_size ({})",
                self.min_size, self.max_size
            )));
        }
        if self.validation_query().is_some() && self.idle_check_interval_secs == 0 {
            return Err(PoolError::Configuration(
                "idle_check_interval_secs must be greater than 0 when a validation query is set"
                    .into(),
            ));
        }
        Ok(())
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Get the minimum pool size
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the maximum wait, or `None` when acquire must fail fast
    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_ms > 0).then(|| Duration::from_millis(self.max_wait_ms as u64))
    }

    pub fn test_on_borrow(&self) -> bool {
        self.test_on_borrow
    }

    pub fn test_on_return(&self) -> bool {
        self.test_on_return
    }

    /// Get the validation query; blank queries count as unset
    pub fn validation_query(&self) -> Option<&str> {
        self.validation_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
    }

    pub fn idle_check_interval(&self) -> Duration {
        Duration::from_secs(self.idle_check_interval_secs)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_secs(self.validation_timeout_secs)
    }

    /// Build the driver-level configuration for opening connections
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(&self.driver, &self.url)
            .with_credentials(self.user.clone(), self.password.clone())
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - min_size: 1
    /// - max_size: 10
    /// - max_wait: 5 seconds
    /// - validation: disabled
    /// - idle_check_interval: 60 seconds
    /// - validation_timeout: 5 seconds
    fn default() -> Self {
        Self::new(1, 10)
    }
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("max_wait_ms", &self.max_wait_ms)
            .field("test_on_borrow", &self.test_on_borrow)
            .field("test_on_return", &self.test_on_return)
            .field("validation_query", &self.validation_query)
            .field("idle_check_interval_secs", &self.idle_check_interval_secs)
            .field("validation_timeout_secs", &self.validation_timeout_secs)
            .finish()
    }
}
