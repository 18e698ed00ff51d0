//! Admin surface for the WebSocket engine
//!
//! Mounted by the binary under `/api/admin/websocket`; responses use the
//! same `{success, data?, error?, message?}` envelope as the rest of the
//! admin API.

use crate::engine::WsEngine;
use crate::types::WsEndpointDraft;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use mockhive_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Build the WebSocket admin router.
pub fn ws_admin_router(engine: Arc<WsEngine>) -> Router {
    Router::new()
        .route("/endpoints", get(list_endpoints).post(create_endpoint))
        .route(
            "/endpoints/{id}",
            get(get_endpoint).put(update_endpoint).delete(delete_endpoint),
        )
        .route("/endpoints/{id}/broadcast", post(broadcast))
        .route("/connections", get(connections))
        .route("/connections/{id}", axum::routing::delete(close_connection))
        .route("/connections/{id}/send", post(send_message))
        .route("/logs", get(logs).delete(clear_logs))
        .route("/stats", get(stats))
        .with_state(engine)
}

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({"success": true, "data": data})))
}

fn created(data: Value) -> Reply {
    (StatusCode::CREATED, Json(json!({"success": true, "data": data})))
}

fn error_reply(e: &Error) -> Reply {
    let status = match e {
        Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::Validation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"success": false, "error": e.to_string()})))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionParams {
    endpoint_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LogParams {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Value,
}

impl MessageBody {
    fn render(&self) -> String {
        match &self.message {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

async fn list_endpoints(State(engine): State<Arc<WsEngine>>) -> Reply {
    ok(json!(engine.list_endpoints().await))
}

async fn create_endpoint(
    State(engine): State<Arc<WsEngine>>,
    Json(draft): Json<WsEndpointDraft>,
) -> Reply {
    match engine.create_endpoint(draft).await {
        Ok(endpoint) => created(json!(endpoint)),
        Err(e) => error_reply(&e),
    }
}

async fn get_endpoint(State(engine): State<Arc<WsEngine>>, Path(id): Path<String>) -> Reply {
    match engine.get_endpoint(&id).await {
        Some(endpoint) => ok(json!(endpoint)),
        None => error_reply(&Error::not_found(format!("WebSocket endpoint not found: {}", id))),
    }
}

async fn update_endpoint(
    State(engine): State<Arc<WsEngine>>,
    Path(id): Path<String>,
    Json(draft): Json<WsEndpointDraft>,
) -> Reply {
    match engine.update_endpoint(&id, draft).await {
        Ok(endpoint) => ok(json!(endpoint)),
        Err(e) => error_reply(&e),
    }
}

async fn delete_endpoint(State(engine): State<Arc<WsEngine>>, Path(id): Path<String>) -> Reply {
    match engine.delete_endpoint(&id).await {
        Ok(endpoint) => ok(json!(endpoint)),
        Err(e) => error_reply(&e),
    }
}

async fn broadcast(
    State(engine): State<Arc<WsEngine>>,
    Path(id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Reply {
    if engine.get_endpoint(&id).await.is_none() {
        return error_reply(&Error::not_found(format!("WebSocket endpoint not found: {}", id)));
    }
    let delivered = engine.broadcast_text(&id, &body.render()).await;
    ok(json!({"delivered": delivered}))
}

async fn connections(
    State(engine): State<Arc<WsEngine>>,
    Query(params): Query<ConnectionParams>,
) -> Reply {
    ok(json!(engine.connections(params.endpoint_id.as_deref()).await))
}

async fn close_connection(State(engine): State<Arc<WsEngine>>, Path(id): Path<String>) -> Reply {
    match engine.close_connection(&id).await {
        Ok(()) => ok(json!({"connectionId": id})),
        Err(e) => error_reply(&e),
    }
}

async fn send_message(
    State(engine): State<Arc<WsEngine>>,
    Path(id): Path<String>,
    Json(body): Json<MessageBody>,
) -> Reply {
    match engine.send_text(&id, &body.render()).await {
        Ok(()) => ok(json!({"connectionId": id})),
        Err(e) => error_reply(&e),
    }
}

async fn logs(State(engine): State<Arc<WsEngine>>, Query(params): Query<LogParams>) -> Reply {
    ok(json!(engine.logs(params.limit).await))
}

async fn clear_logs(State(engine): State<Arc<WsEngine>>) -> Reply {
    let removed = engine.clear_logs().await;
    ok(json!({"removed": removed}))
}

async fn stats(State(engine): State<Arc<WsEngine>>) -> Reply {
    ok(json!(engine.stats().await))
}
