//! Storefront domain: the cart, catalog pagination and checkout state
//! machines that make up a user's session.
//!
//! The state types are plain values. [`SessionRepository`] loads them from
//! and saves them to a session store, and [`CatalogNavigator`] moves the
//! pagination cursor against the catalog repository.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod session;

pub use cart::{Cart, CartEntry, InvoiceLine};
pub use catalog::{
    CatalogEntry, CatalogNavigator, DEFAULT_PAGE_SIZE, NavAction, Navigation, NavigationError,
    PageWindow, PaginationCursor, ProductCard, Stage, paginate,
};
pub use checkout::{
    CheckoutError, CheckoutForm, CheckoutState, CheckoutStep, DeliverySummary, InputOutcome,
    PaidOrder, PaymentRequest, SuccessfulPayment, payment_refunded,
};
pub use error::{DomainError, Result};
pub use session::{SessionRepository, UserSession};
