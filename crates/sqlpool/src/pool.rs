//! Connection pooling for database connections
//!
//! The pool lends physical connections to callers and takes them back,
//! growing one connection at a time up to `max_size` and never shrinking.
//! Waiting for a free connection is bounded by `max_wait_ms`; a value of
//! zero or less makes acquire fail immediately when the pool is saturated.
//!
//! # Example
//!
//! ```ignore
//! use sqlpool::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(2, 8)
//!     .with_url("sqlite:app.db")
//!     .with_max_wait_ms(500)
//!     .with_validation_query("SELECT 1")
//!     .with_test_on_borrow(true);
//!
//! let pool = ConnectionPool::builder().config(config).build().await?;
//! let conn = pool.acquire().await?;
//! conn.query("SELECT * FROM users", &[]).await?;
//! pool.release(conn).await?;
//! ```

mod config;
mod handle;
mod idle;
mod pool;
mod stats;


pub use config::PoolConfig;
pub use handle::{HandleId, PooledConnection};
pub use idle::IdleCheckReport;
pub use pool::{ConnectionPool, PoolBuilder};
pub use stats::PoolStats;
