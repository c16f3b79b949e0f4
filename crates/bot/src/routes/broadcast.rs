//! Promo broadcaster status.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use broadcast::BroadcastStatus;

use crate::AppState;

/// GET /broadcast/status: current phase and the outcome of the last tick.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<BroadcastStatus> {
    Json(state.broadcast.status())
}
