//! Health endpoint.

use axum::extract::State;
use axum::response::Json;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::trace;

use crate::state::AppState;

/// `GET /api/health` — liveness plus per-service status.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    trace!("health check requested");

    let services: BTreeMap<String, _> = state.service_statuses.all().into_iter().collect();

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "services": services,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
