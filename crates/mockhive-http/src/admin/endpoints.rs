//! Endpoint CRUD handlers

use axum::extract::{Path, State};
use axum::Json;
use mockhive_core::EndpointDraft;
use tracing::info;

use super::{created, fail, from_error, ok, AdminResult};
use crate::state::AppState;

pub(super) async fn list(State(state): State<AppState>) -> AdminResult {
    ok(state.store.list().await)
}

pub(super) async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AdminResult {
    match state.store.get(&id).await {
        Some(endpoint) => ok(endpoint),
        None => fail(
            axum::http::StatusCode::NOT_FOUND,
            format!("Endpoint not found: {}", id),
        ),
    }
}

pub(super) async fn create(
    State(state): State<AppState>,
    Json(draft): Json<EndpointDraft>,
) -> AdminResult {
    match state.store.create(draft).await {
        Ok(endpoint) => {
            info!(id = %endpoint.id, method = %endpoint.method, path = %endpoint.path, "endpoint created");
            created(endpoint)
        }
        Err(e) => from_error(&e),
    }
}

pub(super) async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(draft): Json<EndpointDraft>,
) -> AdminResult {
    match state.store.update(&id, draft).await {
        Ok(endpoint) => {
            info!(id = %endpoint.id, "endpoint updated");
            ok(endpoint)
        }
        Err(e) => from_error(&e),
    }
}

pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AdminResult {
    match state.store.delete(&id).await {
        Ok(endpoint) => {
            info!(id = %endpoint.id, "endpoint deleted");
            ok(endpoint)
        }
        Err(e) => from_error(&e),
    }
}
