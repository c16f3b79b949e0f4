//! Bot error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use repository::RepositoryError;
use session_store::SessionStoreError;
use thiserror::Error;

/// Errors that fail a whole webhook request.
///
/// Stale or out-of-order user actions are not reported through this type;
/// the dispatcher answers them with a neutral reply instead.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Session store error: {0}")]
    Session(#[from] SessionStoreError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for BotError {
    fn into_response(self) -> Response {
        let status = match &self {
            BotError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BotError::Domain(err) if err.is_rejected_action() => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal server error");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::CheckoutError;

    #[test]
    fn storage_errors_map_to_500() {
        let err = BotError::from(RepositoryError::Unavailable("down".into()));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rejected_actions_map_to_409() {
        let err = BotError::from(DomainError::from(CheckoutError::NotCollecting));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let err = BotError::BadRequest("nope".into());
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
