//! Registry export/import as plain JSON

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use mockhive_core::Endpoint;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::{fail, ok, ok_with_message, AdminResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct ImportParams {
    merge: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImportBody {
    endpoints: Vec<Endpoint>,
}

pub(super) async fn export(State(state): State<AppState>) -> AdminResult {
    let endpoints = state.store.list().await;
    ok(json!({
        "exportedAt": Utc::now().to_rfc3339(),
        "count": endpoints.len(),
        "endpoints": endpoints,
    }))
}

pub(super) async fn import(
    State(state): State<AppState>,
    Query(params): Query<ImportParams>,
    Json(body): Json<ImportBody>,
) -> AdminResult {
    if body.endpoints.is_empty() {
        return fail(
            axum::http::StatusCode::BAD_REQUEST,
            "Import payload contains no endpoints",
        );
    }
    let merge = params.merge.unwrap_or(false);
    let imported = state.store.import(body.endpoints, merge).await;
    info!(imported, merge, "endpoints imported");
    ok_with_message(json!({"imported": imported, "merge": merge}), "Import complete")
}
