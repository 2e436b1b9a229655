//! sqlpool - a bounded pool of reusable database connections
//!
//! Callers borrow a connection with [`ConnectionPool::acquire`], use it, and
//! hand it back with [`ConnectionPool::release`] instead of opening a new
//! physical connection per operation. The pool grows one connection at a
//! time up to its configured maximum, validates connections on borrow, on
//! return and in a periodic idle check, and never shrinks.

mod factory;
pub mod health;
pub mod pool;
mod registry;

#[cfg(test)]
mod testing;

pub use factory::{ConnectionFactory, DriverConnectionFactory};
pub use health::{Validator, default_validation_query};
pub use pool::{
    ConnectionPool, HandleId, IdleCheckReport, PoolBuilder, PoolConfig, PoolStats, PooledConnection,
};
pub use registry::DriverRegistry;
pub use sqlpool_core::{Connection, DatabaseDriver, PoolError, Result};
