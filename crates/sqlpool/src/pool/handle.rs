//! Handles lent to callers by the pool

use std::ops::Deref;
use std::sync::{Arc, Weak};

use sqlpool_core::{Connection, Result};

use super::pool::PoolInner;

/// Stable identity of a pooled connection: its position in the pool.
///
/// The physical connection behind a handle may be replaced by validation;
/// the `HandleId` never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) usize);

impl HandleId {
    /// Position of this handle in the pool's insertion order
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A connection borrowed from the pool
///
/// Return it with [`PooledConnection::release`] or
/// [`ConnectionPool::release`](super::ConnectionPool::release). A handle
/// that is dropped without being released is returned to the pool
/// automatically. Outside a Tokio runtime that return happens synchronously
/// and skips `test_on_return`; the connection is still closed if the pool
/// has been closed meanwhile.
pub struct PooledConnection {
    id: HandleId,
    connection: Arc<dyn Connection>,
    /// Routes the return call; confers no ownership of the pool
    pool: Weak<PoolInner>,
    armed: bool,
}

impl PooledConnection {
    pub(crate) fn new(id: HandleId, connection: Arc<dyn Connection>, pool: Weak<PoolInner>) -> Self {
        Self {
            id,
            connection,
            pool,
            armed: true,
        }
    }

    /// Identity of this handle within its pool
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Get the underlying connection as an Arc
    pub fn inner(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Return this handle to the pool it came from.
    ///
    /// A no-op when the pool has already been dropped.
    pub async fn release(mut self) -> Result<()> {
        self.armed = false;
        match self.pool.upgrade() {
            Some(pool) => pool.release_slot(self.id).await,
            None => Ok(()),
        }
    }

    pub(crate) fn is_owned_by(&self, pool: &Arc<PoolInner>) -> bool {
        std::ptr::eq(self.pool.as_ptr(), Arc::as_ptr(pool))
    }

    /// Take the slot out of this handle so dropping it no longer returns it
    pub(crate) fn disarm(mut self) -> HandleId {
        self.armed = false;
        self.id
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.connection.as_ref()
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.id)
            .field("driver", &self.connection.driver_name())
            .finish()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(pool) = self.pool.upgrade() else {
            return;
        };

        let id = self.id;
        tracing::debug!(handle = %id, "pooled connection dropped without release");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if let Err(e) = pool.release_slot(id).await {
                        tracing::warn!(handle = %id, error = %e, "release after drop failed");
                    }
                });
            }
            Err(_) => pool.free_slot_blocking(id),
        }
    }
}
