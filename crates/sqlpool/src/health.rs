//! Connection validation for pooled connections
//!
//! A [`Validator`] probes a pooled connection and, when the probe reports it
//! dead, swaps in a fresh physical connection from the pool's factory. The
//! handle keeps its identity; only the session behind it changes.
//!
//! # Example
//!
//! ```ignore
//! use sqlpool::health::Validator;
//! use std::time::Duration;
//!
//! let validator = Validator::new(Some("SELECT 1".into()), Duration::from_secs(5));
//! let replaced = validator.check(&mut connection, &factory).await?;
//! ```

mod ping;
mod validator;

#[cfg(test)]
mod tests;

pub use ping::default_validation_query;
pub use validator::Validator;
