//! Shared identifiers and value types used across the storefront crates.

mod money;
mod types;

pub use money::Money;
pub use types::{CategoryId, ParseIdError, ProductId, PromoId, SubcategoryId, UserId};
