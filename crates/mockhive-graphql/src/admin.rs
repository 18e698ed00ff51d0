//! Admin surface for the GraphQL engine
//!
//! Mounted by the binary under `/api/admin/graphql`; responses use the
//! shared `{success, data?, error?, message?}` envelope.

use crate::registry::GraphQLRegistry;
use crate::types::{GraphQLEndpointDraft, GraphQLResolverDraft};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use mockhive_core::Error;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Build the GraphQL admin router.
pub fn graphql_admin_router(registry: Arc<GraphQLRegistry>) -> Router {
    Router::new()
        .route("/endpoints", get(list_endpoints).post(create_endpoint))
        .route(
            "/endpoints/{id}",
            get(get_endpoint).put(update_endpoint).delete(delete_endpoint),
        )
        .route("/endpoints/{id}/resolvers", axum::routing::post(add_resolver))
        .route(
            "/endpoints/{id}/resolvers/{resolverId}",
            axum::routing::put(update_resolver).delete(delete_resolver),
        )
        .route("/logs", get(logs).delete(clear_logs))
        .with_state(registry)
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
struct LogParams {
    limit: Option<usize>,
}

async fn list_endpoints(State(registry): State<Arc<GraphQLRegistry>>) -> Reply {
    ok(json!(registry.list_endpoints().await))
}

async fn create_endpoint(
    State(registry): State<Arc<GraphQLRegistry>>,
    Json(draft): Json<GraphQLEndpointDraft>,
) -> Reply {
    match registry.create_endpoint(draft).await {
        Ok(endpoint) => created(json!(endpoint)),
        Err(e) => error_reply(&e),
    }
}

async fn get_endpoint(State(registry): State<Arc<GraphQLRegistry>>, Path(id): Path<String>) -> Reply {
    match registry.get_endpoint(&id).await {
        Some(endpoint) => ok(json!(endpoint)),
        None => error_reply(&Error::not_found(format!("GraphQL endpoint not found: {}", id))),
    }
}

async fn update_endpoint(
    State(registry): State<Arc<GraphQLRegistry>>,
    Path(id): Path<String>,
    Json(draft): Json<GraphQLEndpointDraft>,
) -> Reply {
    match registry.update_endpoint(&id, draft).await {
        Ok(endpoint) => ok(json!(endpoint)),
        Err(e) => error_reply(&e),
    }
}

async fn delete_endpoint(
    State(registry): State<Arc<GraphQLRegistry>>,
    Path(id): Path<String>,
) -> Reply {
    match registry.delete_endpoint(&id).await {
        Ok(endpoint) => ok(json!(endpoint)),
        Err(e) => error_reply(&e),
    }
}

async fn add_resolver(
    State(registry): State<Arc<GraphQLRegistry>>,
    Path(id): Path<String>,
    Json(draft): Json<GraphQLResolverDraft>,
) -> Reply {
    match registry.add_resolver(&id, draft).await {
        Ok(resolver) => created(json!(resolver)),
        Err(e) => error_reply(&e),
    }
}

async fn update_resolver(
    State(registry): State<Arc<GraphQLRegistry>>,
    Path((id, resolver_id)): Path<(String, String)>,
    Json(draft): Json<GraphQLResolverDraft>,
) -> Reply {
    match registry.update_resolver(&id, &resolver_id, draft).await {
        Ok(resolver) => ok(json!(resolver)),
        Err(e) => error_reply(&e),
    }
}

async fn delete_resolver(
    State(registry): State<Arc<GraphQLRegistry>>,
    Path((id, resolver_id)): Path<(String, String)>,
) -> Reply {
    match registry.delete_resolver(&id, &resolver_id).await {
        Ok(()) => ok(json!({"resolverId": resolver_id})),
        Err(e) => error_reply(&e),
    }
}

async fn logs(
    State(registry): State<Arc<GraphQLRegistry>>,
    Query(params): Query<LogParams>,
) -> Reply {
    ok(json!(registry.logs(params.limit).await))
}

async fn clear_logs(State(registry): State<Arc<GraphQLRegistry>>) -> Reply {
    let removed = registry.clear_logs().await;
    ok(json!({"removed": removed}))
}
