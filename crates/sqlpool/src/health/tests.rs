//! Tests for connection validation

use std::sync::Arc;
use std::time::Duration;

use sqlpool_core::{Connection, PoolError};

use super::*;
use crate::pool::PoolConfig;
use crate::testing::{MockConnection, MockConnectionFactory, connection_id};

fn enabled() -> Validator {
    Validator::new(Some("SELECT 1".into()), Duration::from_secs(2))
}

// =============================================================================
// Validator construction
// =============================================================================

#[test]
fn test_validator_disabled_without_query() {
    assert!(!Validator::new(None, Duration::from_secs(1)).is_enabled());
    assert!(!Validator::new(Some("   ".into()), Duration::from_secs(1)).is_enabled());
}

#[test]
fn test_validator_from_config() {
    let config = PoolConfig::new(1, 4)
        .with_validation_query("SELECT 1")
        .with_validation_timeout_secs(3);
    let validator = Validator::from_config(&config);

    assert!(validator.is_enabled());
    assert_eq!(validator.query(), Some("SELECT 1"));
    assert_eq!(validator.timeout(), Duration::from_secs(3));
}

#[test]
fn test_default_validation_query() {
    assert_eq!(default_validation_query("sqlite"), "SELECT 1");
    assert_eq!(default_validation_query("oracle"), "SELECT 1 FROM DUAL");
    assert_eq!(default_validation_query("unknown"), "SELECT 1");
}

// =============================================================================
// Validator::check
// =============================================================================

#[tokio::test]
async fn test_check_is_noop_when_disabled() {
    let factory = MockConnectionFactory::new();
    let mock = Arc::new(MockConnection::new(7));
    mock.kill();
    let mut conn: Arc<dyn Connection> = mock;

    let validator = Validator::new(None, Duration::from_secs(1));
    let replaced = validator.check(&mut conn, &factory).await.expect("check");

    assert!(!replaced);
    assert_eq!(factory.count(), 0);
    assert_eq!(connection_id(conn.as_ref()).await, 7);
}

#[tokio::test]
async fn test_check_keeps_live_connection() {
    let factory = MockConnectionFactory::new();
    let mut conn: Arc<dyn Connection> = Arc::new(MockConnection::new(7));

    let replaced = enabled().check(&mut conn, &factory).await.expect("check");

    assert!(!replaced);
    assert_eq!(factory.count(), 0);
}

#[tokio::test]
async fn test_check_replaces_dead_connection() {
    let factory = MockConnectionFactory::new();
    let dead = Arc::new(MockConnection::new(100));
    dead.kill();
    let mut conn: Arc<dyn Connection> = dead.clone();

    let replaced = enabled().check(&mut conn, &factory).await.expect("check");

    assert!(replaced);
    assert_eq!(factory.count(), 1);
    assert_eq!(connection_id(conn.as_ref()).await, 0);
    assert!(dead.is_closed(), "replaced connection should be closed");
}

#[tokio::test]
async fn test_check_wraps_replacement_failure() {
    let factory = MockConnectionFactory::new();
    factory.set_failing(true);
    let dead = Arc::new(MockConnection::new(1));
    dead.kill();
    let mut conn: Arc<dyn Connection> = dead;

    let err = enabled()
        .check(&mut conn, &factory)
        .await
        .err()
        .expect("replacement should fail");

    assert!(matches!(err, PoolError::ConnectionPool { .. }));
    assert_eq!(connection_id(conn.as_ref()).await, 1, "connection untouched");
}

#[tokio::test]
async fn test_check_propagates_probe_failure() {
    let factory = MockConnectionFactory::new();
    let mock = Arc::new(MockConnection::new(1));
    mock.fail_probe();
    let mut conn: Arc<dyn Connection> = mock;

    let err = enabled()
        .check(&mut conn, &factory)
        .await
        .err()
        .expect("probe should fail");

    match err {
        PoolError::ConnectionPool { source, .. } => {
            assert!(matches!(*source, PoolError::Connection(_)));
        }
        other => panic!("expected ConnectionPool, got {:?}", other),
    }
    assert_eq!(factory.count(), 0, "a failed probe is not treated as dead");
}
