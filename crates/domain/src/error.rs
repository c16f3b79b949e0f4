//! Domain error types.

use repository::RepositoryError;
use session_store::SessionStoreError;
use thiserror::Error;

use crate::catalog::NavigationError;
use crate::checkout::CheckoutError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the session store.
    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),

    /// An error occurred reading the catalog.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// The requested catalog move is not possible from the current stage.
    #[error("Navigation error: {0}")]
    Navigation(#[from] NavigationError),

    /// The checkout dialogue rejected the request.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// A session section could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true for errors caused by a stale or out-of-order user action
    /// rather than by storage.
    pub fn is_rejected_action(&self) -> bool {
        matches!(self, DomainError::Navigation(_) | DomainError::Checkout(_))
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
