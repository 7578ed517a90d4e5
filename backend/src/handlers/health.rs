use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::Json;
use serde_json::json;

use crate::middleware::RequestId;
use crate::AppState;

pub async fn health(State(state): State<Arc<AppState>>, Extension(request_id): Extension<RequestId>) -> Json<serde_json::Value> {
    let uptime_seconds = state.started_at.elapsed().as_secs();
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptimeSeconds": uptime_seconds,
        "version": env!("CARGO_PKG_VERSION"),
        "environment": std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        "memory": {
            "cacheEntries": state.orchestrator.cache().len(),
        },
        "requestId": request_id.0,
    }))
}
