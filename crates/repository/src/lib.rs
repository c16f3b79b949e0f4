//! Storage contracts consumed by the storefront core.
//!
//! The core never talks to a database directly. It reads the catalog, the
//! user set and promos through the traits in [`store`], and hands finished
//! orders to an [`OrderLedger`]. Two implementations ship with the crate: an
//! in-memory one for tests and database-less runs, and a PostgreSQL one.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod store;

pub use error::{RepositoryError, Result};
pub use memory::{InMemoryLedger, InMemoryRepository};
pub use model::{
    Category, ClientIdentity, NewUser, OrderLine, OrderRecord, OrderStatus, Product, Promo,
    RefundRecord, Registration, StoredOrder, Subcategory, User,
};
pub use postgres::{PostgresLedger, PostgresRepository};
pub use store::{
    CatalogRepository, OrderLedger, PromoRepository, Repository, UserBatchStream, UserRepository,
};
