//! Rate limit admin handlers

use axum::extract::{Path, State};
use serde_json::json;

use super::{ok, ok_with_message, AdminResult};
use crate::state::AppState;

pub(super) async fn reset_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AdminResult {
    let removed = state.rate_limiter.reset_endpoint(&id).await;
    ok_with_message(
        json!({"endpointId": id, "removed": removed}),
        "Rate limit counters reset",
    )
}

pub(super) async fn reset_all(State(state): State<AppState>) -> AdminResult {
    let removed = state.rate_limiter.reset_all().await;
    ok_with_message(json!({"removed": removed}), "All rate limit counters reset")
}

pub(super) async fn stats(State(state): State<AppState>) -> AdminResult {
    ok(state.rate_limiter.stats().await)
}
