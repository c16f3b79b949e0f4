//! Broadcast error types.

use repository::RepositoryError;
use thiserror::Error;

/// Errors that abort a broadcast tick.
///
/// Delivery failures are not errors at this level; they are counted in the
/// tick's report.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// Another tick is still in flight.
    #[error("a broadcast tick is already running")]
    AlreadyRunning,

    /// Reading promos or users failed. The promo stays active.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Convenience type alias for broadcast results.
pub type Result<T> = std::result::Result<T, BroadcastError>;
