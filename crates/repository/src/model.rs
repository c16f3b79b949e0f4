//! Records exchanged with storage.

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId, PromoId, SubcategoryId, UserId};
use serde::{Deserialize, Serialize};

/// A top-level catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A subcategory within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub name: String,
}

/// A sellable product as published by the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub unit_price: Money,
    /// URL or file reference of the product picture.
    pub image: String,
}

/// A promotional message scheduled for broadcast to every user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promo {
    pub id: PromoId,
    pub name: String,
    /// Message body shown under the cover image.
    pub text: String,
    /// URL or file reference of the cover image.
    pub cover: String,
    pub link: String,
    /// Caption of the link button.
    pub link_label: String,
    pub start_time: DateTime<Utc>,
    pub active: bool,
    pub last_succeeded_at: Option<DateTime<Utc>>,
}

impl Promo {
    /// A promo is eligible once it is active and its start time has passed.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.active && self.start_time <= now
    }
}

/// A registered bot user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub is_admin: bool,
    pub is_staff: bool,
}

/// Identity details captured when a user first talks to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub id: UserId,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            first_name: self.first_name,
            username: self.username,
            is_admin: false,
            is_staff: false,
        }
    }
}

/// Outcome of registering a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    AlreadyExisted,
}

/// Who placed an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub user_id: UserId,
    pub username: Option<String>,
}

/// One purchased product, priced at the snapshot taken when it entered the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl OrderLine {
    pub fn total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A paid order handed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub client: ClientIdentity,
    pub lines: Vec<OrderLine>,
    pub payment_reference: String,
    pub paid_amount: Money,
    pub currency: String,
    pub fio: String,
    pub phone: String,
    pub address: String,
}

/// A refund reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub payment_reference: String,
    pub refunded_amount: Money,
    pub currency: String,
}

/// Ledger status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Paid,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Paid => "paid",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An order as kept by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredOrder {
    pub record: OrderRecord,
    pub status: OrderStatus,
    pub refunded_amount: Option<Money>,
    pub created_at: DateTime<Utc>,
}
