//! Promo broadcasting.
//!
//! A [`BroadcastScheduler`] wakes a [`BroadcastJob`] on a fixed interval. Each
//! tick picks the earliest eligible promo, notifies every registered user
//! through a [`Notifier`] and then marks the promo consumed. Individual
//! delivery failures are logged and counted; they never stop the pass.

pub mod error;
pub mod job;
pub mod notifier;
pub mod scheduler;
pub mod state;

pub use error::{BroadcastError, Result};
pub use job::{BroadcastConfig, BroadcastJob, BroadcastReport, BroadcastStatus, TickOutcome};
pub use notifier::{InMemoryNotifier, LinkButton, Notification, Notifier, NotifyError};
pub use scheduler::BroadcastScheduler;
pub use state::BroadcastPhase;
