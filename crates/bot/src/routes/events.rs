//! Inbound chat event webhook.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::AppState;
use crate::error::{BotError, Result};
use crate::events::InboundEvent;
use crate::reply::EventResponse;

/// POST /events: runs one user event and returns the replies to send back.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<InboundEvent>, JsonRejection>,
) -> Result<Json<EventResponse>> {
    let Json(event) = payload.map_err(|e| BotError::BadRequest(e.body_text()))?;
    let replies = state.dispatcher.dispatch(event).await?;
    Ok(Json(EventResponse { replies }))
}
