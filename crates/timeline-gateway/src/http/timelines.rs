use axum::{extract::State, Json};
use std::sync::Arc;
use timeline_protocol::TimelineEntry;

use crate::app::AppState;

/// GET /timelines: ordered snapshot of the shared store. Read-only.
pub async fn list_handler(State(state): State<Arc<AppState>>) -> Json<Vec<TimelineEntry>> {
    Json(state.hub.entries())
}
