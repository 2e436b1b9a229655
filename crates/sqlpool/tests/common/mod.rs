//! Shared fixtures for the pool integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlpool::{Connection, ConnectionFactory, PoolConfig, PoolError, Result};
use sqlpool_core::{QueryResult, Row, StatementResult, Value};

/// In-process connection that reports a serial number from every query
pub struct StubConnection {
    serial: usize,
    alive: AtomicBool,
    closed: AtomicBool,
}

impl StubConnection {
    pub fn serial(&self) -> usize {
        self.serial
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for StubConnection {
    fn driver_name(&self) -> &str {
        "stub"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Ok(StatementResult { affected_rows: 1 })
    }

    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(PoolError::Connection("server went away".into()));
        }
        let mut result = QueryResult::empty();
        result.rows.push(Row::new(
            vec!["serial".to_string()],
            vec![Value::Int64(self.serial as i64)],
        ));
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Factory handing out numbered `StubConnection`s, optionally slowly
#[derive(Default)]
pub struct StubFactory {
    next: AtomicUsize,
    connect_delay: Option<Duration>,
    created: parking_lot::Mutex<Vec<Arc<StubConnection>>>,
}

impl StubFactory {
    pub fn with_connect_delay(delay: Duration) -> Self {
        Self {
            connect_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn count(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    pub fn created(&self, n: usize) -> Arc<StubConnection> {
        self.created.lock()[n].clone()
    }
}

#[async_trait]
impl ConnectionFactory for StubFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        let conn = Arc::new(StubConnection {
            serial: self.next.fetch_add(1, Ordering::SeqCst),
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        });
        self.created.lock().push(conn.clone());
        Ok(conn)
    }
}

pub fn stub_config(min_size: usize, max_size: usize, max_wait_ms: i64) -> PoolConfig {
    PoolConfig::new(min_size, max_size)
        .with_url("stub://integration")
        .with_max_wait_ms(max_wait_ms)
}

/// Serial number of the physical connection behind a handle
pub async fn serial_of(conn: &dyn Connection) -> anyhow::Result<i64> {
    let result = conn.query("SELECT serial", &[]).await?;
    result
        .rows
        .first()
        .and_then(|row| row.get(0))
        .and_then(Value::as_i64)
        .ok_or_else(|| anyhow::anyhow!("query returned no serial"))
}
