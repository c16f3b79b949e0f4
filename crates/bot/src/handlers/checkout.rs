use domain::{CheckoutError, CheckoutStep, DomainError, InputOutcome};
use session_store::SessionKey;

use super::cart::EMPTY_CART;
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::reply::Reply;

fn prompt(step: CheckoutStep, previous: &str) -> String {
    match step {
        CheckoutStep::Fio => "Please enter the recipient's full name".to_string(),
        CheckoutStep::Phone => {
            format!("Recipient: {previous}\nEnter the recipient's phone number")
        }
        CheckoutStep::Address => format!("Phone: {previous}\nEnter the pickup point address"),
        CheckoutStep::AwaitingPayment => "Press Pay to complete the order".to_string(),
    }
}

impl Dispatcher {
    pub(crate) async fn begin_checkout(&self, key: &SessionKey) -> Result<Vec<Reply>> {
        let mut session = self.sessions.load(key).await?;

        match session.checkout.begin(&session.cart) {
            Ok(step) => {
                self.sessions.save_checkout(key, &session.checkout).await?;
                Ok(vec![Reply::text(prompt(step, ""))])
            }
            Err(CheckoutError::EmptyCart) => Ok(vec![Reply::text(EMPTY_CART)]),
            Err(CheckoutError::AwaitingPayment) => Ok(vec![Reply::text(
                "An invoice for your order is already waiting for payment",
            )]),
            Err(e) => Err(DomainError::from(e).into()),
        }
    }

    pub(crate) async fn cancel_checkout(&self, key: &SessionKey) -> Result<Vec<Reply>> {
        let mut checkout = self.sessions.load_checkout(key).await?;
        match checkout.cancel() {
            Ok(true) => {
                self.sessions.save_checkout(key, &checkout).await?;
                Ok(vec![Reply::text("Checkout cancelled")])
            }
            Ok(false) => Ok(vec![Reply::toast("There is no order in progress")]),
            Err(CheckoutError::AwaitingPayment) => Ok(vec![Reply::text(
                "The invoice has already been issued and can still be paid",
            )]),
            Err(e) => Err(DomainError::from(e).into()),
        }
    }

    /// Free text is checkout input while a checkout is collecting details.
    pub(crate) async fn text_input(&self, key: &SessionKey, text: String) -> Result<Vec<Reply>> {
        let mut session = self.sessions.load(key).await?;
        if session.checkout.is_idle() {
            return Ok(vec![Reply::main_menu("Please choose one of the menu items")]);
        }

        let outcome = session
            .checkout
            .accept_input(text.clone(), &session.cart, &self.settings.currency)
            .map_err(DomainError::from)?;
        self.sessions.save_checkout(key, &session.checkout).await?;

        Ok(match outcome {
            InputOutcome::Next(step) => vec![Reply::text(prompt(step, &text))],
            InputOutcome::Payment(request) => {
                let summary = format!(
                    "Recipient: {}\nPhone: {}\nPickup point: {}",
                    request.summary.fio, request.summary.phone, request.summary.address
                );
                vec![Reply::text(summary), Reply::Invoice { request }]
            }
        })
    }
}
