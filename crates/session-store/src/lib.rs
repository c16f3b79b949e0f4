//! Session storage for per-user conversational state.
//!
//! A session is a shallow JSON value-bag keyed by `(namespace, user_id)`.
//! Higher layers persist each section of their state (cart, pagination
//! cursor, checkout form) under its own top-level key and write it back with
//! [`SessionStore::merge`], so sections never clobber each other.

pub mod error;
pub mod key;
pub mod lock;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, SessionStoreError};
pub use key::{Namespace, SessionKey};
pub use lock::{SessionGuard, UserLocks};
pub use memory::InMemorySessionStore;
pub use postgres::PostgresSessionStore;
pub use store::{SessionStore, SessionStoreExt, StateBag, decode_field};
