//! Per-feature event handlers, implemented as methods on
//! [`crate::Dispatcher`].

mod cart;
mod catalog;
mod checkout;
mod onboarding;
mod payments;
