//! sqlpool core - contracts shared by the pool and its drivers
//!
//! This crate defines the collaborators the pool manager consumes:
//!
//! - `Connection` - a live physical database session, including its liveness check
//! - `DatabaseDriver` - creates physical connections from a `ConnectionConfig`
//! - `PoolError` - the error taxonomy surfaced by every sqlpool crate
//! - Common result types like `Value`, `Row` and `QueryResult`

mod connection;
mod driver;
mod error;
mod types;

pub use connection::*;
pub use driver::*;
pub use error::*;
pub use types::*;
