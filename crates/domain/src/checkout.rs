//! Checkout dialogue.
//!
//! ```text
//! Idle ──begin──► Fio ──► Phone ──► Address ──► AwaitingPayment ──paid──► Idle
//!                  │        │          │
//!                  └────────┴──────────┴───cancel───► Idle
//! ```
//!
//! Once the payment request is out, only the payment itself leaves
//! `AwaitingPayment`: the invoice may already be in the user's hands.

use common::Money;
use repository::{ClientIdentity, OrderLine, OrderRecord, RefundRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cart::{Cart, InvoiceLine};

/// The field the dialogue is currently asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Fio,
    Phone,
    Address,
    /// Every field is collected and a payment request was issued.
    AwaitingPayment,
}

impl CheckoutStep {
    /// Returns true while the step still collects free text.
    pub fn can_accept_input(&self) -> bool {
        !matches!(self, CheckoutStep::AwaitingPayment)
    }

    pub fn can_complete_payment(&self) -> bool {
        matches!(self, CheckoutStep::AwaitingPayment)
    }

    fn next(&self) -> CheckoutStep {
        match self {
            CheckoutStep::Fio => CheckoutStep::Phone,
            CheckoutStep::Phone => CheckoutStep::Address,
            CheckoutStep::Address | CheckoutStep::AwaitingPayment => {
                CheckoutStep::AwaitingPayment
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Fio => "fio",
            CheckoutStep::Phone => "phone",
            CheckoutStep::Address => "address",
            CheckoutStep::AwaitingPayment => "awaiting_payment",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery details gathered during checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub fio: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl CheckoutForm {
    fn set(&mut self, step: CheckoutStep, text: String) {
        match step {
            CheckoutStep::Fio => self.fio = Some(text),
            CheckoutStep::Phone => self.phone = Some(text),
            CheckoutStep::Address => self.address = Some(text),
            CheckoutStep::AwaitingPayment => {}
        }
    }

    fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            fio: self.fio.clone().unwrap_or_default(),
            phone: self.phone.clone().unwrap_or_default(),
            address: self.address.clone().unwrap_or_default(),
        }
    }
}

/// The three collected delivery fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub fio: String,
    pub phone: String,
    pub address: String,
}

/// Invoice issued once every field is collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub total: Money,
    pub currency: String,
    pub summary: DeliverySummary,
    pub lines: Vec<InvoiceLine>,
}

/// What happened after a piece of text was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Ask for the next field.
    Next(CheckoutStep),
    /// Every field is in; send the invoice.
    Payment(PaymentRequest),
}

/// A confirmed payment reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessfulPayment {
    pub payment_reference: String,
    pub total: Money,
    pub currency: String,
}

/// Checkout errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("cannot check out an empty cart")]
    EmptyCart,

    #[error("a payment request is already pending")]
    AwaitingPayment,

    #[error("no checkout in progress")]
    NotCollecting,
}

/// A confirmed payment turned into a ledger record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaidOrder {
    pub record: OrderRecord,
    /// False when no payment request was pending, e.g. a repeated
    /// confirmation or a session that expired before the payment arrived.
    pub matched_invoice: bool,
}

/// Checkout progress stored in the session. `step == None` means idle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutState {
    pub step: Option<CheckoutStep>,
    pub form: CheckoutForm,
    /// Cart lines as they were invoiced.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invoiced: Vec<OrderLine>,
}

impl CheckoutState {
    pub fn is_idle(&self) -> bool {
        self.step.is_none()
    }

    /// Starts (or restarts) collecting delivery details.
    pub fn begin(&mut self, cart: &Cart) -> Result<CheckoutStep, CheckoutError> {
        if self.step == Some(CheckoutStep::AwaitingPayment) {
            return Err(CheckoutError::AwaitingPayment);
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        *self = CheckoutState {
            step: Some(CheckoutStep::Fio),
            ..CheckoutState::default()
        };
        Ok(CheckoutStep::Fio)
    }

    /// Stores `text` under the current step and moves on.
    ///
    /// Input is not validated. Completing the address issues the payment
    /// request for the cart as it is now.
    pub fn accept_input(
        &mut self,
        text: impl Into<String>,
        cart: &Cart,
        currency: &str,
    ) -> Result<InputOutcome, CheckoutError> {
        let step = match self.step {
            None => return Err(CheckoutError::NotCollecting),
            Some(step) if !step.can_accept_input() => return Err(CheckoutError::AwaitingPayment),
            Some(step) => step,
        };

        self.form.set(step, text.into());
        let next = step.next();
        self.step = Some(next);

        if next == CheckoutStep::AwaitingPayment {
            self.invoiced = cart.to_order_lines();
            Ok(InputOutcome::Payment(PaymentRequest {
                total: cart.total(),
                currency: currency.to_string(),
                summary: self.form.summary(),
                lines: cart.invoice_lines(),
            }))
        } else {
            Ok(InputOutcome::Next(next))
        }
    }

    /// Abandons the checkout while details are still being collected.
    ///
    /// Returns false if nothing was in progress. Fails once the payment
    /// request has been issued.
    pub fn cancel(&mut self) -> Result<bool, CheckoutError> {
        match self.step {
            None => Ok(false),
            Some(step) if step.can_complete_payment() => Err(CheckoutError::AwaitingPayment),
            Some(_) => {
                *self = CheckoutState::default();
                Ok(true)
            }
        }
    }

    /// Turns a confirmed payment into a ledger record and returns to idle.
    ///
    /// The money has already moved, so a record is produced whatever the
    /// state. Lines are the invoiced ones when a request was pending, the
    /// current cart otherwise.
    pub fn payment_succeeded(
        &mut self,
        client: ClientIdentity,
        payment: SuccessfulPayment,
        cart: &Cart,
    ) -> PaidOrder {
        let matched_invoice = self.step.is_some_and(|s| s.can_complete_payment());
        let lines = if matched_invoice && !self.invoiced.is_empty() {
            std::mem::take(&mut self.invoiced)
        } else {
            cart.to_order_lines()
        };

        let summary = self.form.summary();
        let record = OrderRecord {
            client,
            lines,
            payment_reference: payment.payment_reference,
            paid_amount: payment.total,
            currency: payment.currency,
            fio: summary.fio,
            phone: summary.phone,
            address: summary.address,
        };
        *self = CheckoutState::default();
        PaidOrder {
            record,
            matched_invoice,
        }
    }
}

/// Builds the ledger update for a refunded payment.
///
/// Refunds do not depend on session state and never touch the cart.
pub fn payment_refunded(
    payment_reference: impl Into<String>,
    refunded_amount: Money,
    currency: impl Into<String>,
) -> RefundRecord {
    RefundRecord {
        payment_reference: payment_reference.into(),
        refunded_amount,
        currency: currency.into(),
    }
}
