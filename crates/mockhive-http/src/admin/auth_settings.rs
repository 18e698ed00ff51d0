//! Global auth simulation settings handlers

use axum::extract::State;
use axum::Json;
use mockhive_core::AuthConfig;
use serde_json::json;
use tracing::info;

use super::{ok, ok_with_message, AdminResult};
use crate::state::AppState;

pub(super) async fn get_settings(State(state): State<AppState>) -> AdminResult {
    let settings = state.auth_settings.read().await.clone();
    ok(json!({"settings": settings}))
}

pub(super) async fn put_settings(
    State(state): State<AppState>,
    Json(config): Json<AuthConfig>,
) -> AdminResult {
    info!(method = config.method.as_str(), enabled = config.enabled, "global auth settings updated");
    *state.auth_settings.write().await = Some(config.clone());
    ok(config)
}

pub(super) async fn delete_settings(State(state): State<AppState>) -> AdminResult {
    *state.auth_settings.write().await = None;
    ok_with_message(json!({}), "Global auth settings cleared")
}
