//! Notifiers that push promo deliveries out of the process.

use std::time::Duration;

use async_trait::async_trait;
use broadcast::{Notification, Notifier, NotifyError};
use common::UserId;
use serde::Serialize;

#[derive(Serialize)]
struct DeliveryBody<'a> {
    user_id: UserId,
    notification: &'a Notification,
}

/// Posts each delivery as JSON to a chat gateway.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        let delivery_failed = |e: reqwest::Error| {
            if e.is_timeout() {
                NotifyError::Timeout { user_id }
            } else {
                NotifyError::Delivery {
                    user_id,
                    reason: e.to_string(),
                }
            }
        };

        self.client
            .post(&self.url)
            .json(&DeliveryBody {
                user_id,
                notification,
            })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(delivery_failed)?;
        Ok(())
    }
}

/// Logs deliveries instead of sending them. Used when no gateway is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(
        &self,
        user_id: UserId,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            %user_id,
            text = %notification.text,
            link = notification.link.as_ref().map(|l| l.url.as_str()).unwrap_or("-"),
            "promo delivery"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tracing_notifier_always_succeeds() {
        let note = Notification::text("hello");
        assert!(TracingNotifier.notify(UserId::new(7), &note).await.is_ok());
    }

    #[tokio::test]
    async fn unreachable_gateway_is_a_delivery_error() {
        // Port 9 on localhost refuses connections.
        let notifier =
            HttpNotifier::new("http://127.0.0.1:9/deliveries", Duration::from_secs(2)).unwrap();

        let err = notifier
            .notify(UserId::new(7), &Notification::text("hello"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            NotifyError::Delivery { user_id, .. } | NotifyError::Timeout { user_id }
                if user_id == UserId::new(7)
        ));
    }
}
