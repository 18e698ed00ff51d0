//! Response history handlers

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::info;

use super::{from_error, ok, AdminResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct HistoryParams {
    limit: Option<usize>,
}

pub(super) async fn for_endpoint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AdminResult {
    ok(state.store.history_for_endpoint(&id).await)
}

pub(super) async fn recent(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AdminResult {
    ok(state.store.history_recent(params.limit.unwrap_or(50)).await)
}

pub(super) async fn restore(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AdminResult {
    match state.store.restore(&id).await {
        Ok(endpoint) => {
            info!(history_id = %id, endpoint_id = %endpoint.id, "endpoint restored from history");
            ok(endpoint)
        }
        Err(e) => from_error(&e),
    }
}
