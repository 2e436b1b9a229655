//! Connection pool implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sqlpool_core::{Connection, PoolError, Result};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::config::PoolConfig;
use super::handle::{HandleId, PooledConnection};
use super::idle::{self, IdleCheckReport};
use super::stats::PoolStats;
use crate::factory::{ConnectionFactory, DriverConnectionFactory};
use crate::health::Validator;
use crate::registry::DriverRegistry;

/// One physical connection owned by the pool
struct Slot {
    connection: Arc<dyn Connection>,
    busy: bool,
    /// Failed validation on return; must pass validation before it is lent out
    stale: bool,
    replacements: u32,
}

impl Slot {
    fn new(connection: Arc<dyn Connection>, busy: bool) -> Self {
        Self {
            connection,
            busy,
            stale: false,
            replacements: 0,
        }
    }
}

/// Mutable pool state, only touched while holding the pool lock
#[derive(Default)]
struct PoolState {
    initialized: bool,
    closed: bool,
    /// Insertion ordered; a slot's index is its `HandleId`
    slots: Vec<Slot>,
}

impl PoolState {
    fn log_digest(&self, event: &'static str) {
        if tracing::enabled!(tracing::Level::DEBUG) {
            let busy: Vec<bool> = self.slots.iter().map(|s| s.busy).collect();
            tracing::debug!(event, total = self.slots.len(), busy = ?busy, "pool status");
        }
    }
}

pub(crate) struct PoolInner {
    id: Uuid,
    config: PoolConfig,
    factory: Arc<dyn ConnectionFactory>,
    validator: Validator,
    /// Single exclusive lock over all pool state
    state: Mutex<PoolState>,
    /// Broadcast to every waiting acquirer when a slot is freed
    available: Notify,
    waiting: AtomicUsize,
    idle_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PoolInner {
    async fn create_connection(&self) -> Result<Arc<dyn Connection>> {
        self.factory
            .create()
            .await
            .map_err(|e| PoolError::connection_pool("failed to create connection", e))
    }

    /// Mark a slot free, validating it first when `test_on_return` is set.
    ///
    /// A slot whose validation fails is still freed so that it is not lost to
    /// the pool, but it is marked stale: the next acquire validates it
    /// regardless of `test_on_borrow` and fails rather than lend it out dead.
    pub(crate) async fn release_slot(&self, id: HandleId) -> Result<()> {
        let mut state = self.state.lock().await;
        let closed = state.closed;

        let Some(slot) = state.slots.get_mut(id.0) else {
            return Err(PoolError::InvalidHandle(format!(
                "handle {} does not belong to pool {}",
                id, self.id
            )));
        };
        if !slot.busy {
            tracing::warn!(handle = %id, "release of a connection that is already free ignored");
            return Ok(());
        }

        let outcome = if self.config.test_on_return() && !closed {
            self.validator
                .check(&mut slot.connection, self.factory.as_ref())
                .await
        } else {
            Ok(false)
        };
        match &outcome {
            Ok(replaced) => {
                if *replaced {
                    slot.replacements += 1;
                }
                slot.stale = false;
            }
            Err(_) => slot.stale = true,
        }
        slot.busy = false;

        if closed {
            if let Err(e) = slot.connection.close().await {
                tracing::debug!(handle = %id, error = %e, "closing connection of closed pool failed");
            }
        }

        state.log_digest("release");
        drop(state);
        self.available.notify_waiters();

        outcome.map(|_| ())
    }

    /// Free a slot without validation, for handles dropped outside a runtime.
    ///
    /// If the pool is already closed the connection is closed on a
    /// short-lived current-thread runtime.
    pub(crate) fn free_slot_blocking(&self, id: HandleId) {
        let mut state = self.state.blocking_lock();
        let closed = state.closed;
        let to_close = match state.slots.get_mut(id.0) {
            Some(slot) => {
                slot.busy = false;
                closed.then(|| slot.connection.clone())
            }
            None => None,
        };
        state.log_digest("release");
        drop(state);
        self.available.notify_waiters();

        if let Some(connection) = to_close {
            match tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
            {
                Ok(runtime) => {
                    if let Err(e) = runtime.block_on(connection.close()) {
                        tracing::debug!(handle = %id, error = %e, "closing connection of closed pool failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(handle = %id, error = %e, "no runtime to close connection of closed pool");
                }
            }
        }
    }

    /// Validate every free connection; `None` once the pool is closed.
    ///
    /// Holds the pool lock for the whole pass so that no acquirer can take a
    /// connection while it is being inspected or replaced.
    pub(crate) async fn run_idle_check(&self) -> Option<IdleCheckReport> {
        let mut state = self.state.lock().await;
        if state.closed {
            return None;
        }

        let mut report = IdleCheckReport::default();
        for (index, slot) in state.slots.iter_mut().enumerate() {
            if slot.busy {
                continue;
            }
            report.checked += 1;
            match self
                .validator
                .check(&mut slot.connection, self.factory.as_ref())
                .await
            {
                Ok(replaced) => {
                    if replaced {
                        slot.replacements += 1;
                        report.replaced += 1;
                    }
                    slot.stale = false;
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        handle = %HandleId(index),
                        error = %e,
                        "idle connection validation failed"
                    );
                }
            }
        }
        state.log_digest("idle_check");
        Some(report)
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        if let Some(task) = self.idle_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Decrements the waiting counter when an acquire stops waiting, including
/// when its future is dropped.
struct WaitingGuard<'a>(&'a AtomicUsize);

impl<'a> WaitingGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A pool of reusable physical database connections
///
/// The pool holds at most `max_size` connections, creates `min_size` of
/// them on [`init`](Self::init), and grows one connection at a time when no
/// free connection exists. It never shrinks. All acquire, release and
/// idle-check work runs under one exclusive lock, including connection
/// creation and validation.
///
/// Waiters are woken by broadcast and race to re-scan; there is no FIFO
/// ordering among them.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl ConnectionPool {
    /// Create an uninitialised pool; call [`init`](Self::init) before use.
    pub fn new<F: ConnectionFactory>(config: PoolConfig, factory: F) -> Self {
        Self::with_factory(config, Arc::new(factory))
    }

    fn with_factory(config: PoolConfig, factory: Arc<dyn ConnectionFactory>) -> Self {
        let validator = Validator::from_config(&config);
        Self {
            inner: Arc::new(PoolInner {
                id: Uuid::new_v4(),
                config,
                factory,
                validator,
                state: Mutex::new(PoolState::default()),
                available: Notify::new(),
                waiting: AtomicUsize::new(0),
                idle_task: parking_lot::Mutex::new(None),
            }),
        }
    }

    /// Start building a pool from a configuration
    pub fn builder() -> PoolBuilder {
        PoolBuilder::default()
    }

    /// Unique identity of this pool
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Get the pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Initialise the pool.
    ///
    /// Validates the configuration, opens `min_size` connections and starts
    /// the idle check when a validation query is configured. Calling it again
    /// on an initialised pool does nothing. If any connection fails to open,
    /// the ones already opened are closed and the pool stays uninitialised.
    #[tracing::instrument(skip(self), fields(pool_id = %self.inner.id))]
    pub async fn init(&self) -> Result<()> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.initialized {
            tracing::debug!("pool already initialised");
            return Ok(());
        }
        inner.config.validate()?;

        let min_size = inner.config.min_size();
        let mut slots = Vec::with_capacity(inner.config.max_size());
        for _ in 0..min_size {
            match inner.create_connection().await {
                Ok(connection) => slots.push(Slot::new(connection, false)),
                Err(e) => {
                    tracing::error!(error = %e, created = slots.len(), "pool initialisation failed");
                    for slot in &slots {
                        let _ = slot.connection.close().await;
                    }
                    return Err(e);
                }
            }
        }
        state.slots = slots;
        state.initialized = true;

        if inner.validator.is_enabled() {
            let period = inner.config.idle_check_interval();
            let task = idle::spawn_idle_check(Arc::downgrade(inner), period);
            *inner.idle_task.lock() = Some(task);
        }

        tracing::info!(
            min_size,
            max_size = inner.config.max_size(),
            idle_check = inner.validator.is_enabled(),
            "connection pool initialised"
        );
        state.log_digest("init");
        Ok(())
    }

    /// Borrow a connection from the pool.
    ///
    /// 1. Hand out the first free connection, validating it first when
    ///    `test_on_borrow` is set or when it failed validation on return.
    /// 2. Otherwise, if under `max_size`, open exactly one new connection.
    /// 3. Otherwise fail immediately when `max_wait` is disabled, or wait for
    ///    a release and start over. The wait is bounded by one deadline
    ///    measured from the call, not re-armed per wake-up.
    ///
    /// Dropping the returned future abandons the wait.
    #[tracing::instrument(skip(self), fields(pool_id = %self.inner.id))]
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let inner = &self.inner;
        let deadline = inner.config.max_wait().map(|wait| Instant::now() + wait);

        loop {
            let mut state = inner.state.lock().await;
            if !state.initialized {
                return Err(PoolError::Configuration(
                    "pool has not been initialised".into(),
                ));
            }
            if state.closed {
                return Err(PoolError::PoolExhausted("pool is closed".into()));
            }

            if let Some(index) = state.slots.iter().position(|s| !s.busy) {
                let slot = &mut state.slots[index];
                slot.busy = true;
                if inner.config.test_on_borrow() || slot.stale {
                    match inner
                        .validator
                        .check(&mut slot.connection, inner.factory.as_ref())
                        .await
                    {
                        Ok(replaced) => {
                            if replaced {
                                slot.replacements += 1;
                            }
                            slot.stale = false;
                        }
                        Err(e) => {
                            slot.busy = false;
                            drop(state);
                            inner.available.notify_waiters();
                            return Err(e);
                        }
                    }
                }
                let connection = slot.connection.clone();
                state.log_digest("acquire");
                return Ok(PooledConnection::new(
                    HandleId(index),
                    connection,
                    Arc::downgrade(inner),
                ));
            }

            if state.slots.len() < inner.config.max_size() {
                let connection = inner.create_connection().await?;
                let index = state.slots.len();
                state.slots.push(Slot::new(connection.clone(), true));
                tracing::debug!(handle = %HandleId(index), "pool grew by one connection");
                state.log_digest("grow");
                return Ok(PooledConnection::new(
                    HandleId(index),
                    connection,
                    Arc::downgrade(inner),
                ));
            }

            let Some(deadline) = deadline else {
                return Err(PoolError::PoolExhausted(format!(
                    "all {} connections are busy",
                    inner.config.max_size()
                )));
            };
            if Instant::now() >= deadline {
                return Err(PoolError::PoolExhausted(format!(
                    "timed out waiting for a free connection (max_wait: {:?})",
                    inner.config.max_wait().unwrap_or_default()
                )));
            }

            // Register interest before releasing the lock so a release in
            // between cannot be missed.
            let notified = inner.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            drop(state);

            let _waiting = WaitingGuard::new(&inner.waiting);
            let _ = tokio::time::timeout_at(deadline, notified).await;
        }
    }

    /// Return a connection to the pool.
    ///
    /// Validates it first when `test_on_return` is set, then marks it free and
    /// wakes every waiting acquirer. A handle from another pool is rejected
    /// with [`PoolError::InvalidHandle`] and goes back to its own pool.
    #[tracing::instrument(skip(self, conn), fields(pool_id = %self.inner.id, handle = %conn.id()))]
    pub async fn release(&self, conn: PooledConnection) -> Result<()> {
        if !conn.is_owned_by(&self.inner) {
            return Err(PoolError::InvalidHandle(format!(
                "handle {} does not belong to pool {}",
                conn.id(),
                self.inner.id
            )));
        }
        let id = conn.disarm();
        self.inner.release_slot(id).await
    }

    /// Run one idle-check pass now, validating every free connection.
    ///
    /// Returns `None` once the pool is closed.
    pub async fn check_idle(&self) -> Option<IdleCheckReport> {
        self.inner.run_idle_check().await
    }

    /// Get current pool statistics
    pub async fn stats(&self) -> PoolStats {
        let state = self.inner.state.lock().await;
        let total = state.slots.len();
        let active = state.slots.iter().filter(|s| s.busy).count();
        let waiting = self.inner.waiting.load(Ordering::SeqCst);
        PoolStats::new(total, active, waiting)
    }

    /// Number of times the connection behind a handle has been replaced
    pub async fn replacements(&self, id: HandleId) -> Option<u32> {
        let state = self.inner.state.lock().await;
        state.slots.get(id.0).map(|s| s.replacements)
    }

    /// Close the pool.
    ///
    /// Stops the idle check and closes every free connection. Connections
    /// still checked out are closed when they are released. Pending and
    /// future acquires fail with [`PoolError::PoolExhausted`].
    #[tracing::instrument(skip(self), fields(pool_id = %self.inner.id))]
    pub async fn close(&self) {
        if let Some(task) = self.inner.idle_task.lock().take() {
            task.abort();
        }

        let mut state = self.inner.state.lock().await;
        if state.closed {
            return;
        }
        state.closed = true;
        for slot in state.slots.iter().filter(|s| !s.busy) {
            if let Err(e) = slot.connection.close().await {
                tracing::debug!(error = %e, "closing pooled connection failed");
            }
        }
        tracing::info!(total = state.slots.len(), "connection pool closed");
        drop(state);
        self.inner.available.notify_waiters();
    }
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder that loads the driver and initialises a pool in one step
#[derive(Default)]
pub struct PoolBuilder {
    config: Option<PoolConfig>,
    registry: Option<DriverRegistry>,
    factory: Option<Arc<dyn ConnectionFactory>>,
}

impl PoolBuilder {
    pub fn config(mut self, config: PoolConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use this registry to load the driver instead of the built-in one
    pub fn registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Open connections through this factory instead of a loaded driver
    pub fn factory<F: ConnectionFactory>(mut self, factory: F) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    /// Load the driver, create the pool and initialise it.
    #[tracing::instrument(skip(self))]
    pub async fn build(self) -> Result<ConnectionPool> {
        let config = self.config.ok_or_else(|| {
            PoolError::Configuration("data source config is missing".into())
        })?;
        config.validate()?;

        let factory = match self.factory {
            Some(factory) => factory,
            None => {
                let registry = self.registry.unwrap_or_default();
                let driver = registry
                    .load(config.driver(), config.url())
                    .map_err(|e| PoolError::connection_pool("failed to load driver", e))?;
                tracing::debug!(driver = driver.id(), "driver loaded");
                let connection_config = config.connection_config();
                Arc::new(DriverConnectionFactory::new(driver, connection_config))
                    as Arc<dyn ConnectionFactory>
            }
        };

        let pool = ConnectionPool::with_factory(config, factory);
        pool.init().await?;
        Ok(pool)
    }
}
