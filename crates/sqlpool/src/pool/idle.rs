//! Periodic validation of free connections

use std::sync::Weak;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::pool::PoolInner;

/// Outcome of one idle-check pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleCheckReport {
    /// Free connections that were probed
    pub checked: usize,
    /// Dead connections swapped for fresh ones
    pub replaced: usize,
    /// Connections whose probe or replacement failed
    pub failed: usize,
}

/// Spawn the idle check, first firing one `period` after start.
///
/// The task holds only a weak reference and ends on its own once the pool
/// is dropped or closed.
pub(crate) fn spawn_idle_check(pool: Weak<PoolInner>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(pool) = pool.upgrade() else {
                break;
            };
            match pool.run_idle_check().await {
                Some(report) => {
                    tracing::debug!(
                        checked = report.checked,
                        replaced = report.replaced,
                        failed = report.failed,
                        "idle check finished"
                    );
                }
                None => break,
            }
        }
        tracing::debug!("idle check stopped");
    })
}
