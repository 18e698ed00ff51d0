//! Scenario counter handlers

use axum::extract::{Path, State};
use serde_json::json;

use super::{ok, ok_with_message, AdminResult};
use crate::state::AppState;

pub(super) async fn reset_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AdminResult {
    let existed = state.store.scenario_reset(&id).await;
    ok_with_message(json!({"endpointId": id, "existed": existed}), "Scenario counter reset")
}

pub(super) async fn reset_all(State(state): State<AppState>) -> AdminResult {
    let removed = state.store.scenario_reset_all().await;
    ok_with_message(json!({"removed": removed}), "All scenario counters reset")
}

pub(super) async fn counters(State(state): State<AppState>) -> AdminResult {
    ok(state.store.scenario_counters().await)
}
