//! Periodic quota replenishment
//!
//! Every interval, all entries below the ceiling are raised in one atomic
//! tick. A failed tick is logged and the next one runs on schedule.

use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::ledger::{LedgerEntry, LedgerStore, ReplenishPolicy};

/// Background task restoring quota toward the ceiling
pub struct Replenisher {
    store: LedgerStore,
    policy: ReplenishPolicy,
    interval: Duration,
}

impl Replenisher {
    pub fn new(store: LedgerStore, policy: ReplenishPolicy, interval: Duration) -> Self {
        Self {
            store,
            policy,
            interval,
        }
    }

    /// Run a single tick
    pub async fn tick(&self) -> Result<Vec<LedgerEntry>> {
        self.store.replenish(&self.policy).await
    }

    /// Tick every interval until `shutdown` is cancelled
    ///
    /// The first tick fires one interval after start.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        info!(
            "Replenishing quotas every {:?} (increment {}, ceiling {}, mode {:?})",
            self.interval, self.policy.increment, self.policy.ceiling, self.policy.mode
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.tick().await {
                        Ok(changed) if changed.is_empty() => {}
                        Ok(changed) => debug!("Replenished {} ledger entries", changed.len()),
                        Err(e) => warn!("Failed to replenish quotas: {}", e),
                    }
                }
            }
        }

        info!("Replenisher stopped");
        Ok(())
    }
}
