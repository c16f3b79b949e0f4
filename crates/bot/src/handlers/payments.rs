use common::Money;
use domain::{SuccessfulPayment, payment_refunded};
use repository::ClientIdentity;
use session_store::SessionKey;

use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::events::ChatUser;
use crate::reply::Reply;

impl Dispatcher {
    pub(crate) async fn payment_succeeded(
        &self,
        key: &SessionKey,
        user: &ChatUser,
        payment_reference: String,
        total_amount: i64,
        currency: String,
    ) -> Result<Vec<Reply>> {
        let mut session = self.sessions.load(key).await?;

        let paid = session.checkout.payment_succeeded(
            ClientIdentity {
                user_id: user.id,
                username: user.username.clone(),
            },
            SuccessfulPayment {
                payment_reference,
                total: Money::from_minor_units(total_amount),
                currency,
            },
            &session.cart,
        );
        if !paid.matched_invoice {
            tracing::warn!(
                user_id = %user.id,
                payment_reference = %paid.record.payment_reference,
                "payment without a pending invoice, recording it from the current cart"
            );
        }

        let record = paid.record;
        let paid_amount = record.paid_amount;
        self.ledger.persist_order(record).await?;
        metrics::counter!("checkout_orders_total").increment(1);
        tracing::info!(
            user_id = %user.id,
            username = user.username.as_deref().unwrap_or("-"),
            paid_amount = %paid_amount,
            "new order"
        );

        if self.settings.clear_cart_on_payment {
            session.cart.clear();
        }
        self.sessions
            .save_cart_and_checkout(key, &session.cart, &session.checkout)
            .await?;

        Ok(vec![Reply::text("Payment completed! Thank you!")])
    }

    pub(crate) async fn payment_refunded(
        &self,
        payment_reference: String,
        total_amount: i64,
        currency: String,
    ) -> Result<Vec<Reply>> {
        let refund = payment_refunded(
            payment_reference,
            Money::from_minor_units(total_amount),
            currency,
        );
        let text = format!("Refund of {} {}", refund.refunded_amount, refund.currency);

        let updated = self.ledger.update_order_on_refund(refund.clone()).await?;
        if updated == 0 {
            tracing::warn!(
                payment_reference = %refund.payment_reference,
                "refund for an unknown payment"
            );
        } else {
            tracing::info!(payment_reference = %refund.payment_reference, "order refunded");
        }

        Ok(vec![Reply::text(text)])
    }
}
