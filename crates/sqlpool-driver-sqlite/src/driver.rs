//! SQLite driver implementation

use std::sync::Arc;

use async_trait::async_trait;
use sqlpool_core::{Connection, ConnectionConfig, DatabaseDriver, PoolError, Result};

use crate::SqliteConnection;

const FILE_EXTENSIONS: [&str; 3] = [".db", ".sqlite", ".sqlite3"];

/// SQLite database driver
///
/// Understands `sqlite:<path>` and `sqlite://<path>` urls, `file:` URIs,
/// `:memory:`, and bare paths ending in `.db`, `.sqlite` or `.sqlite3`.
/// A `path` parameter on the connection config overrides the url.
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }

    /// Extract the database location from a connection config
    pub fn database_path(config: &ConnectionConfig) -> Result<String> {
        if let Some(path) = config.get_param("path") {
            return Ok(path.to_string());
        }

        let url = config.url.trim();
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        if path.is_empty() {
            return Err(PoolError::Configuration(
                "SQLite requires a database path. Example: sqlite:/path/to/database.db".into(),
            ));
        }
        Ok(path.to_string())
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn id(&self) -> &'static str {
        "sqlite"
    }

    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn accepts_url(&self, url: &str) -> bool {
        let url = url.trim();
        url.starts_with("sqlite:")
            || url.starts_with("file:")
            || url == ":memory:"
            || FILE_EXTENSIONS.iter().any(|ext| url.ends_with(ext))
    }

    #[tracing::instrument(skip(self, config), fields(url = %config.url))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connection>> {
        let path = Self::database_path(config)?;

        let conn = SqliteConnection::open(&path).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;

        tracing::debug!(path = %conn.path(), "SQLite connection created");
        Ok(Arc::new(conn))
    }
}
