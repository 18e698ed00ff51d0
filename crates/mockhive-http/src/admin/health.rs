//! Health endpoint

use axum::extract::State;
use chrono::Utc;
use serde_json::json;

use super::{ok, AdminResult};
use crate::state::AppState;

pub(super) async fn health(State(state): State<AppState>) -> AdminResult {
    let endpoints = state.store.list().await;
    let active = endpoints.iter().filter(|e| e.is_active()).count();
    ok(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime": state.started_at.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "counts": {
            "endpoints": endpoints.len(),
            "activeEndpoints": active,
            "logs": state.logger.len().await,
            "environments": state.environments.list().await.len(),
        },
    }))
}
