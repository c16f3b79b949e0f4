use std::sync::Arc;
use std::time::Duration;

use repository::Repository;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::BroadcastError;
use crate::job::{BroadcastJob, TickOutcome};
use crate::notifier::Notifier;

/// Default time between ticks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Runs a [`BroadcastJob`] on a fixed interval until shutdown.
///
/// Ticks run inline in the scheduler loop, so a slow tick delays the next one
/// instead of overlapping it. Ticks missed while a pass was running are
/// skipped.
pub struct BroadcastScheduler<R: ?Sized, N: ?Sized> {
    job: Arc<BroadcastJob<R, N>>,
    interval: Duration,
}

impl<R, N> BroadcastScheduler<R, N>
where
    R: Repository + ?Sized + 'static,
    N: Notifier + ?Sized + 'static,
{
    pub fn new(job: Arc<BroadcastJob<R, N>>, interval: Duration) -> Self {
        Self {
            job,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Starts the loop on its own task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Ticks until `shutdown` flips to true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "broadcast scheduler started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.job.tick().await {
                        Ok(TickOutcome::NoPromo) => {}
                        Ok(TickOutcome::Completed(report)) => {
                            tracing::debug!(promo_id = %report.promo_id, "tick completed");
                        }
                        Err(BroadcastError::AlreadyRunning) => {
                            tracing::warn!("previous broadcast tick still running, skipping");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "broadcast tick failed, promo will be retried");
                        }
                    }
                }
            }
        }

        tracing::info!("broadcast scheduler stopped");
    }
}
