//! HTTP entry point for GraphQL mock endpoints
//!
//! GraphQL endpoints may live on any path, so the router is designed to
//! sit in the application's fallback position: POSTs whose path matches
//! a registered endpoint are executed, everything else is a 404.

use crate::registry::GraphQLRegistry;
use crate::types::GraphQLRequest;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Body size cap for GraphQL documents (1 MiB)
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build a router that answers registered GraphQL paths and 404s the
/// rest. Mount it as the application fallback.
pub fn graphql_router(registry: Arc<GraphQLRegistry>) -> Router {
    Router::new().fallback(handle).with_state(registry)
}

async fn handle(State(registry): State<Arc<GraphQLRegistry>>, req: Request<Body>) -> Response {
    let path = req.uri().path().to_string();

    if req.method() != Method::POST {
        return plain_404(&path);
    }
    let Some(endpoint) = registry.find_by_path(&path).await else {
        return plain_404(&path);
    };

    let bytes = match axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => return invalid_request("Request body could not be read"),
    };
    let request: GraphQLRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(_) => return invalid_request("Request body must be JSON with a 'query' field"),
    };
    if request.query.trim().is_empty() {
        return invalid_request("The 'query' field must not be empty");
    }

    let body = registry.execute(&endpoint, &request).await;
    (StatusCode::OK, Json(body)).into_response()
}

fn invalid_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"errors": [{"message": message}]})),
    )
        .into_response()
}

fn plain_404(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "message": format!("No route matches {}", path),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GraphQLEndpointDraft, GraphQLResolverDraft, OperationType};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn registry_with_endpoint() -> Arc<GraphQLRegistry> {
        let registry = Arc::new(GraphQLRegistry::new());
        registry
            .create_endpoint(GraphQLEndpointDraft {
                path: "/graphql".to_string(),
                status: Default::default(),
                resolvers: vec![GraphQLResolverDraft {
                    operation_name: Some("Hello".to_string()),
                    operation_type: Some(OperationType::Query),
                    variables_match: None,
                    response_data: json!({"greeting": "hi"}),
                    errors: None,
                    delay_ms: None,
                    enabled: true,
                }],
                default_response: None,
            })
            .await
            .unwrap();
        registry
    }

    async fn send(registry: Arc<GraphQLRegistry>, req: Request<Body>) -> (StatusCode, Value) {
        let response = graphql_router(registry).oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_executes_registered_path() {
        let registry = registry_with_endpoint().await;
        let (status, body) = send(
            registry,
            post("/graphql", json!({"query": "query Hello { greeting }"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["greeting"], "hi");
    }

    #[tokio::test]
    async fn test_missing_query_is_400() {
        let registry = registry_with_endpoint().await;
        let (status, body) = send(registry, post("/graphql", json!({"variables": {}}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["errors"][0]["message"].is_string());
    }

    #[tokio::test]
    async fn test_unregistered_path_and_wrong_method_404() {
        let registry = registry_with_endpoint().await;
        let (status, _) = send(
            Arc::clone(&registry),
            post("/other", json!({"query": "{ x }"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let get = Request::builder()
            .uri("/graphql")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(registry, get).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
