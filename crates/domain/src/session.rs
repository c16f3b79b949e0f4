//! Typed view of a user's session.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use session_store::{SessionKey, SessionStore, SessionStoreExt, StateBag, decode_field};

use crate::cart::Cart;
use crate::catalog::PaginationCursor;
use crate::checkout::CheckoutState;
use crate::error::Result;

pub const CART_FIELD: &str = "cart";
pub const PAGINATION_FIELD: &str = "pagination";
pub const CHECKOUT_FIELD: &str = "checkout";

/// Every section of a session, decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserSession {
    pub cart: Cart,
    pub cursor: PaginationCursor,
    pub checkout: CheckoutState,
}

/// Reads and writes session sections on top of a [`SessionStore`].
///
/// Each save touches only its own section.
pub struct SessionRepository<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for SessionRepository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

impl<S: SessionStore + ?Sized> SessionRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loads every section with a single read.
    pub async fn load(&self, key: &SessionKey) -> Result<UserSession> {
        let mut state = self.store.get(key).await?;
        Ok(UserSession {
            cart: decode_field(&mut state, CART_FIELD)?,
            cursor: decode_field(&mut state, PAGINATION_FIELD)?,
            checkout: decode_field(&mut state, CHECKOUT_FIELD)?,
        })
    }

    pub async fn load_cart(&self, key: &SessionKey) -> Result<Cart> {
        Ok(self.store.load_field(key, CART_FIELD).await?)
    }

    pub async fn save_cart(&self, key: &SessionKey, cart: &Cart) -> Result<()> {
        Ok(self.store.store_field(key, CART_FIELD, cart).await?)
    }

    pub async fn load_cursor(&self, key: &SessionKey) -> Result<PaginationCursor> {
        Ok(self.store.load_field(key, PAGINATION_FIELD).await?)
    }

    pub async fn save_cursor(&self, key: &SessionKey, cursor: &PaginationCursor) -> Result<()> {
        Ok(self.store.store_field(key, PAGINATION_FIELD, cursor).await?)
    }

    pub async fn load_checkout(&self, key: &SessionKey) -> Result<CheckoutState> {
        Ok(self.store.load_field(key, CHECKOUT_FIELD).await?)
    }

    pub async fn save_checkout(&self, key: &SessionKey, checkout: &CheckoutState) -> Result<()> {
        Ok(self.store.store_field(key, CHECKOUT_FIELD, checkout).await?)
    }

    /// Writes the cart and checkout sections in one merge.
    pub async fn save_cart_and_checkout(
        &self,
        key: &SessionKey,
        cart: &Cart,
        checkout: &CheckoutState,
    ) -> Result<()> {
        let mut partial = StateBag::new();
        partial.insert(CART_FIELD.to_string(), encode(cart)?);
        partial.insert(CHECKOUT_FIELD.to_string(), encode(checkout)?);
        Ok(self.store.merge(key, partial).await?)
    }
}
