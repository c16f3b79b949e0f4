use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId, PromoId, SubcategoryId, UserId};
use futures_core::Stream;

use crate::{
    Category, NewUser, OrderRecord, Product, Promo, RefundRecord, Registration, Result,
    Subcategory,
};

/// A finite stream of user-id batches.
///
/// Each item holds at most the requested batch size. Every call to
/// [`UserRepository::stream_users`] starts a fresh pass from the beginning.
pub type UserBatchStream = Pin<Box<dyn Stream<Item = Result<Vec<UserId>>> + Send>>;

/// Read access to the catalog tree.
///
/// Every listing is ordered by name so pagination windows are stable.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn list_subcategories(&self, category_id: CategoryId) -> Result<Vec<Subcategory>>;

    async fn list_products(&self, subcategory_id: SubcategoryId) -> Result<Vec<Product>>;

    /// Returns None if the product doesn't exist.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;
}

/// The set of users known to the bot.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Registers a user; registering a known user is not an error.
    async fn register_user(&self, user: NewUser) -> Result<Registration>;

    /// Streams every user id in batches of `batch_size`.
    ///
    /// Implementations fetch one batch at a time and never hold the full
    /// user set in memory.
    async fn stream_users(&self, batch_size: usize) -> Result<UserBatchStream>;
}

/// Promo scheduling state.
#[async_trait]
pub trait PromoRepository: Send + Sync {
    /// Returns the eligible promo with the earliest start time, if any.
    async fn find_eligible_promo(&self, now: DateTime<Utc>) -> Result<Option<Promo>>;

    /// Deactivates a promo and records when its broadcast finished.
    async fn mark_promo_consumed(&self, promo_id: PromoId, now: DateTime<Utc>) -> Result<()>;
}

/// Everything the core reads from and writes to storage.
pub trait Repository: CatalogRepository + UserRepository + PromoRepository {}

impl<T: CatalogRepository + UserRepository + PromoRepository + ?Sized> Repository for T {}

/// External record of paid and refunded orders.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    async fn persist_order(&self, record: OrderRecord) -> Result<()>;

    /// Marks every order paid with the refunded payment as refunded.
    ///
    /// Returns the number of orders updated.
    async fn update_order_on_refund(&self, refund: RefundRecord) -> Result<u64>;
}
