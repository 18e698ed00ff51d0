//! Request log handlers

use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use mockhive_core::LogQuery;
use serde::Deserialize;

use super::{ok, ok_with_message, AdminResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LogParams {
    endpoint_id: Option<String>,
    method: Option<String>,
    status: Option<u16>,
    path: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

pub(super) async fn query(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> AdminResult {
    let query = LogQuery {
        endpoint_id: params.endpoint_id,
        method: params.method,
        status: params.status,
        path_contains: params.path,
        from: params.from,
        to: params.to,
        limit: params.limit,
    };
    ok(state.logger.query(&query).await)
}

pub(super) async fn stats(State(state): State<AppState>) -> AdminResult {
    ok(state.logger.stats().await)
}

pub(super) async fn clear(State(state): State<AppState>) -> AdminResult {
    let removed = state.logger.clear().await;
    ok_with_message(
        serde_json::json!({"removed": removed}),
        "Request log cleared",
    )
}
