//! Mock connections and factories shared by the unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlpool_core::{
    ColumnMeta, Connection, PoolError, QueryResult, Result, Row, StatementResult, Value,
};

use crate::factory::ConnectionFactory;

/// Mock connection whose liveness can be flipped by the test
pub(crate) struct MockConnection {
    id: usize,
    alive: AtomicBool,
    closed: AtomicBool,
    probe_fails: AtomicBool,
}

impl MockConnection {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            alive: AtomicBool::new(true),
            closed: AtomicBool::new(false),
            probe_fails: AtomicBool::new(false),
        }
    }

    pub(crate) fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub(crate) fn fail_probe(&self) {
        self.probe_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connection for MockConnection {
    fn driver_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, _sql: &str, _params: &[Value]) -> Result<StatementResult> {
        Ok(StatementResult { affected_rows: 0 })
    }

    /// Every query returns a single row holding this connection's id.
    async fn query(&self, _sql: &str, _params: &[Value]) -> Result<QueryResult> {
        let mut result = QueryResult::empty();
        result.columns.push(ColumnMeta {
            name: "id".into(),
            data_type: "INTEGER".into(),
            ordinal: 0,
        });
        result
            .rows
            .push(Row::new(vec!["id".to_string()], vec![Value::Int64(self.id as i64)]));
        Ok(result)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn is_valid(&self, _validation_query: &str, _timeout: Duration) -> Result<bool> {
        if self.probe_fails.load(Ordering::SeqCst) {
            return Err(PoolError::Connection("probe failed".into()));
        }
        Ok(self.alive.load(Ordering::SeqCst) && !self.is_closed())
    }
}

/// Mock factory that counts and remembers the connections it created
pub(crate) struct MockConnectionFactory {
    counter: AtomicUsize,
    fail: AtomicBool,
    created: Mutex<Vec<Arc<MockConnection>>>,
}

impl MockConnectionFactory {
    pub(crate) fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            created: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn count(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Get the `n`th connection this factory created
    pub(crate) fn created(&self, n: usize) -> Arc<MockConnection> {
        self.created.lock()[n].clone()
    }
}

#[async_trait]
impl ConnectionFactory for MockConnectionFactory {
    async fn create(&self) -> Result<Arc<dyn Connection>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PoolError::Connection("connection refused".into()));
        }
        let id = self.counter.fetch_add(1, Ordering::SeqCst);
        let conn = Arc::new(MockConnection::new(id));
        self.created.lock().push(conn.clone());
        Ok(conn)
    }
}

/// Read the id a mock connection reports for itself
pub(crate) async fn connection_id(conn: &dyn Connection) -> i64 {
    let result = conn.query("SELECT id", &[]).await.expect("query");
    result.rows[0]
        .get(0)
        .and_then(Value::as_i64)
        .expect("id column")
}
