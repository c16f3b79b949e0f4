//! Outbound notification trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::UserId;
use repository::Promo;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A button that opens a URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

/// A message pushed to a user outside of any conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub text: String,
    /// URL or file reference of the attached picture.
    pub image: Option<String>,
    pub link: Option<LinkButton>,
}

impl Notification {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
            link: None,
        }
    }
}

impl From<&Promo> for Notification {
    fn from(promo: &Promo) -> Self {
        Self {
            text: promo.text.clone(),
            image: Some(promo.cover.clone()),
            link: Some(LinkButton {
                label: promo.link_label.clone(),
                url: promo.link.clone(),
            }),
        }
    }
}

/// Errors reported by a notifier for a single delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The transport rejected or failed the delivery.
    #[error("delivery to user {user_id} failed: {reason}")]
    Delivery { user_id: UserId, reason: String },

    /// The delivery did not finish in time.
    #[error("delivery to user {user_id} timed out")]
    Timeout { user_id: UserId },
}

/// Delivers notifications to users.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: UserId, notification: &Notification)
    -> Result<(), NotifyError>;
}

#[derive(Debug, Default)]
struct InMemoryNotifierState {
    delivered: Vec<(UserId, Notification)>,
    failing: HashSet<UserId>,
    delays: HashMap<UserId, Duration>,
    default_delay: Option<Duration>,
}

/// In-memory notifier for testing.
///
/// Records every successful delivery. Users can be marked as failing or slow.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    state: Arc<RwLock<InMemoryNotifierState>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every delivery to `user_id` fail.
    pub fn set_fail_for(&self, user_id: UserId) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .failing
            .insert(user_id);
    }

    /// Delays deliveries to `user_id` by `delay`.
    pub fn set_delay_for(&self, user_id: UserId, delay: Duration) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .delays
            .insert(user_id, delay);
    }

    /// Delays every delivery without a per-user delay.
    pub fn set_default_delay(&self, delay: Duration) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .default_delay = Some(delay);
    }

    /// Returns every successful delivery in order.
    pub fn deliveries(&self) -> Vec<(UserId, Notification)> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .delivered
            .clone()
    }

    pub fn delivered_to(&self, user_id: UserId) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .delivered
            .iter()
            .filter(|(id, _)| *id == user_id)
            .count()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let (delay, fail) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (
                state.delays.get(&user_id).copied().or(state.default_delay),
                state.failing.contains(&user_id),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if fail {
            return Err(NotifyError::Delivery {
                user_id,
                reason: "bot was blocked by the user".to_string(),
            });
        }

        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .delivered
            .push((user_id, notification.clone()));
        Ok(())
    }
}
