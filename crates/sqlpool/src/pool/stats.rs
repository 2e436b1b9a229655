//! Point-in-time pool counters

use serde::{Deserialize, Serialize};

/// Snapshot of a pool taken under its lock
///
/// `idle` is derived from the slot count and the busy flags, so
/// `idle + active == total` always holds. `waiting` is read from an atomic
/// counter outside the lock and may lag by one in either direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Physical connections opened so far; never shrinks
    total: usize,
    /// Slots whose busy flag is clear
    idle: usize,
    /// Handles currently lent to callers
    active: usize,
    /// Acquire calls parked until a release or their `max_wait` deadline
    waiting: usize,
}

impl PoolStats {
    /// `active` is clamped to `total`.
    pub fn new(total: usize, active: usize, waiting: usize) -> Self {
        let active = active.min(total);
        Self {
            total,
            idle: total - active,
            active,
            waiting,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn idle(&self) -> usize {
        self.idle
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn waiting(&self) -> usize {
        self.waiting
    }

    /// Share of opened connections that are lent out, `0.0` for an empty pool
    pub fn utilization(&self) -> f64 {
        match self.total {
            0 => 0.0,
            total => self.active as f64 / total as f64,
        }
    }

    /// No free slot: the next acquire must grow the pool or wait
    pub fn is_full(&self) -> bool {
        self.total > 0 && self.idle == 0
    }
}
