//! One broadcast pass over the user base.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use common::{PromoId, UserId};
use futures_util::TryStreamExt;
use futures_util::future::join_all;
use repository::{Promo, Repository};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{BroadcastError, Result};
use crate::notifier::{Notification, Notifier, NotifyError};
use crate::state::BroadcastPhase;

/// Default number of users fetched and notified together.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default bound on a single delivery.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Tuning for a [`BroadcastJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastConfig {
    pub batch_size: usize,
    pub notify_timeout: Duration,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }
}

/// Delivery counts for one promo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub promo_id: PromoId,
    pub attempted: usize,
    pub delivered: usize,
    /// Failed deliveries, timeouts included.
    pub failed: usize,
    pub timed_out: usize,
}

impl BroadcastReport {
    fn new(promo_id: PromoId) -> Self {
        Self {
            promo_id,
            attempted: 0,
            delivered: 0,
            failed: 0,
            timed_out: 0,
        }
    }

    fn record(&mut self, outcome: &std::result::Result<(), NotifyError>) {
        self.attempted += 1;
        match outcome {
            Ok(()) => self.delivered += 1,
            Err(NotifyError::Timeout { .. }) => {
                self.failed += 1;
                self.timed_out += 1;
            }
            Err(NotifyError::Delivery { .. }) => self.failed += 1,
        }
    }
}

/// Result of a completed tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No promo was eligible; nothing was sent.
    NoPromo,
    /// A promo was broadcast and consumed.
    Completed(BroadcastReport),
}

/// Snapshot of the job for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastStatus {
    pub phase: BroadcastPhase,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_report: Option<BroadcastReport>,
    pub last_error: Option<String>,
}

/// Broadcasts the earliest eligible promo to every user.
///
/// Ticks never overlap: a tick started while another one is running fails
/// with [`BroadcastError::AlreadyRunning`] and has no side effects.
pub struct BroadcastJob<R: ?Sized, N: ?Sized> {
    repo: Arc<R>,
    notifier: Arc<N>,
    config: BroadcastConfig,
    tick_guard: Mutex<()>,
    status: RwLock<BroadcastStatus>,
}

impl<R, N> BroadcastJob<R, N>
where
    R: Repository + ?Sized,
    N: Notifier + ?Sized,
{
    pub fn new(repo: Arc<R>, notifier: Arc<N>, config: BroadcastConfig) -> Self {
        Self {
            repo,
            notifier,
            config: BroadcastConfig {
                batch_size: config.batch_size.max(1),
                ..config
            },
            tick_guard: Mutex::new(()),
            status: RwLock::new(BroadcastStatus::default()),
        }
    }

    pub fn config(&self) -> BroadcastConfig {
        self.config
    }

    /// Returns the current phase and the result of the last tick.
    pub fn status(&self) -> BroadcastStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn phase(&self) -> BroadcastPhase {
        self.status().phase
    }

    fn set_phase(&self, phase: BroadcastPhase) {
        self.status
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .phase = phase;
    }

    /// Runs one tick using the current time.
    pub async fn tick(&self) -> Result<TickOutcome> {
        self.tick_at(Utc::now()).await
    }

    /// Runs one tick, treating `now` as the current time for eligibility.
    #[tracing::instrument(skip(self))]
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        let Ok(_guard) = self.tick_guard.try_lock() else {
            metrics::counter!("broadcast_ticks_total", "outcome" => "skipped").increment(1);
            return Err(BroadcastError::AlreadyRunning);
        };

        let started = Instant::now();
        let result = self.run(now).await;

        let outcome_label = match &result {
            Ok(TickOutcome::NoPromo) => "no_promo",
            Ok(TickOutcome::Completed(_)) => "completed",
            Err(_) => "failed",
        };
        metrics::counter!("broadcast_ticks_total", "outcome" => outcome_label).increment(1);
        if let Ok(TickOutcome::Completed(_)) = &result {
            metrics::histogram!("broadcast_duration_seconds")
                .record(started.elapsed().as_secs_f64());
        }

        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        status.phase = BroadcastPhase::Idle;
        status.last_tick_at = Some(now);
        match &result {
            Ok(TickOutcome::Completed(report)) => {
                status.last_report = Some(report.clone());
                status.last_error = None;
            }
            Ok(TickOutcome::NoPromo) => status.last_error = None,
            Err(e) => status.last_error = Some(e.to_string()),
        }
        result
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<TickOutcome> {
        self.set_phase(BroadcastPhase::FindingPromo);
        let Some(promo) = self.repo.find_eligible_promo(now).await? else {
            tracing::debug!("no eligible promo");
            return Ok(TickOutcome::NoPromo);
        };

        self.set_phase(BroadcastPhase::Broadcasting);
        tracing::info!(promo_id = %promo.id, name = %promo.name, "broadcasting promo");
        let report = self.broadcast(&promo).await?;

        self.set_phase(BroadcastPhase::Consuming);
        self.repo.mark_promo_consumed(promo.id, now).await?;

        tracing::info!(
            promo_id = %promo.id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "promo broadcast finished"
        );
        Ok(TickOutcome::Completed(report))
    }

    async fn broadcast(&self, promo: &Promo) -> Result<BroadcastReport> {
        let notification = Notification::from(promo);
        let mut report = BroadcastReport::new(promo.id);
        let mut users = self.repo.stream_users(self.config.batch_size).await?;

        while let Some(batch) = users.try_next().await? {
            let outcomes = join_all(
                batch
                    .iter()
                    .map(|user_id| self.deliver(*user_id, &notification)),
            )
            .await;
            for outcome in &outcomes {
                report.record(outcome);
            }
        }

        Ok(report)
    }

    async fn deliver(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> std::result::Result<(), NotifyError> {
        let outcome = tokio::time::timeout(
            self.config.notify_timeout,
            self.notifier.notify(user_id, notification),
        )
        .await
        .unwrap_or(Err(NotifyError::Timeout { user_id }));

        match &outcome {
            Ok(()) => {
                metrics::counter!("broadcast_notifications_total", "outcome" => "delivered")
                    .increment(1);
            }
            Err(e) => {
                let label = match e {
                    NotifyError::Timeout { .. } => "timed_out",
                    NotifyError::Delivery { .. } => "failed",
                };
                metrics::counter!("broadcast_notifications_total", "outcome" => label)
                    .increment(1);
                tracing::warn!(user_id = %user_id, error = %e, "promo delivery failed");
            }
        }
        outcome
    }
}
