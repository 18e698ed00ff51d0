//! Proxy cache admin handlers

use axum::extract::State;
use serde_json::json;

use super::{ok, ok_with_message, AdminResult};
use crate::state::AppState;

pub(super) async fn cache_stats(State(state): State<AppState>) -> AdminResult {
    ok(json!({"entries": state.proxy.cache_len().await}))
}

pub(super) async fn clear_cache(State(state): State<AppState>) -> AdminResult {
    let removed = state.proxy.clear_cache().await;
    ok_with_message(json!({"removed": removed}), "Proxy cache cleared")
}
