//! Environment registry and overlay settings handlers

use axum::extract::{Path, State};
use axum::Json;
use mockhive_core::EnvironmentSettings;
use serde::Deserialize;

use super::{created, from_error, ok, ok_with_message, AdminResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct EnvironmentBody {
    name: Option<String>,
    description: Option<String>,
}

pub(super) async fn get_settings(State(state): State<AppState>) -> AdminResult {
    ok(state.environments.settings().await)
}

pub(super) async fn put_settings(
    State(state): State<AppState>,
    Json(settings): Json<EnvironmentSettings>,
) -> AdminResult {
    state.environments.update_settings(settings.clone()).await;
    ok(settings)
}

pub(super) async fn delete_settings(State(state): State<AppState>) -> AdminResult {
    state.environments.clear_settings().await;
    ok_with_message(serde_json::json!({}), "Environment settings reset")
}

pub(super) async fn list(State(state): State<AppState>) -> AdminResult {
    ok(state.environments.list().await)
}

pub(super) async fn create(
    State(state): State<AppState>,
    Json(body): Json<EnvironmentBody>,
) -> AdminResult {
    let Some(name) = body.name else {
        return from_error(&mockhive_core::Error::validation("Environment name is required"));
    };
    match state.environments.create(&name, body.description).await {
        Ok(def) => created(def),
        Err(e) => from_error(&e),
    }
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(body): Json<EnvironmentBody>,
) -> AdminResult {
    match state.environments.update(&name, body.description).await {
        Ok(def) => ok(def),
        Err(e) => from_error(&e),
    }
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AdminResult {
    match state.environments.delete(&name).await {
        Ok(()) => ok_with_message(serde_json::json!({"name": name}), "Environment deleted"),
        Err(e) => from_error(&e),
    }
}
