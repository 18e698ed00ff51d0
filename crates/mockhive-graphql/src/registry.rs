//! GraphQL endpoint registry and request execution

use crate::types::{
    parse_operation, GraphQLEndpoint, GraphQLEndpointDraft, GraphQLRequest, GraphQLResolver,
    GraphQLResolverDraft, OperationType,
};
use chrono::{DateTime, Utc};
use mockhive_core::{Error, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim().trim_start_matches('/'))
}

/// One logged GraphQL operation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLLogEntry {
    /// Entry id
    pub id: String,
    /// Endpoint id
    pub endpoint_id: String,
    /// Endpoint path
    pub path: String,
    /// Effective operation name, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Parsed operation type, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,
    /// Id of the resolver that answered, if one matched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver_id: Option<String>,
    /// Handling time in milliseconds
    pub response_time_ms: u64,
    /// When the request arrived
    pub timestamp: DateTime<Utc>,
}

/// Registry of GraphQL mock endpoints plus the operation log
pub struct GraphQLRegistry {
    endpoints: Arc<RwLock<Vec<GraphQLEndpoint>>>,
    logs: Arc<RwLock<VecDeque<GraphQLLogEntry>>>,
    max_logs: usize,
}

impl Default for GraphQLRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphQLRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            endpoints: Arc::new(RwLock::new(Vec::new())),
            logs: Arc::new(RwLock::new(VecDeque::new())),
            max_logs: 1000,
        }
    }

    fn build(draft: GraphQLEndpointDraft) -> GraphQLEndpoint {
        let now = Utc::now();
        GraphQLEndpoint {
            id: uuid::Uuid::new_v4().to_string(),
            path: normalize_path(&draft.path),
            status: draft.status,
            resolvers: draft.resolvers.into_iter().map(GraphQLResolverDraft::build).collect(),
            default_response: draft.default_response,
            created_at: now,
            updated_at: now,
        }
    }

    /// Register a new endpoint.
    pub async fn create_endpoint(&self, draft: GraphQLEndpointDraft) -> Result<GraphQLEndpoint> {
        if draft.path.trim().is_empty() {
            return Err(Error::validation("GraphQL endpoint path must not be empty"));
        }
        let endpoint = Self::build(draft);
        self.endpoints.write().await.push(endpoint.clone());
        info!(id = %endpoint.id, path = %endpoint.path, "graphql endpoint created");
        Ok(endpoint)
    }

    /// Replace an endpoint's definition.
    pub async fn update_endpoint(
        &self,
        id: &str,
        draft: GraphQLEndpointDraft,
    ) -> Result<GraphQLEndpoint> {
        let mut endpoints = self.endpoints.write().await;
        let position = endpoints
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::not_found(format!("GraphQL endpoint not found: {}", id)))?;
        let mut updated = Self::build(draft);
        updated.id = endpoints[position].id.clone();
        updated.created_at = endpoints[position].created_at;
        updated.updated_at = Utc::now();
        endpoints[position] = updated.clone();
        Ok(updated)
    }

    /// Remove an endpoint.
    pub async fn delete_endpoint(&self, id: &str) -> Result<GraphQLEndpoint> {
        let mut endpoints = self.endpoints.write().await;
        let position = endpoints
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::not_found(format!("GraphQL endpoint not found: {}", id)))?;
        Ok(endpoints.remove(position))
    }

    /// Fetch one endpoint.
    pub async fn get_endpoint(&self, id: &str) -> Option<GraphQLEndpoint> {
        self.endpoints.read().await.iter().find(|e| e.id == id).cloned()
    }

    /// All endpoints in registration order.
    pub async fn list_endpoints(&self) -> Vec<GraphQLEndpoint> {
        self.endpoints.read().await.clone()
    }

    /// First active endpoint registered for `path`.
    pub async fn find_by_path(&self, path: &str) -> Option<GraphQLEndpoint> {
        let path = normalize_path(path);
        self.endpoints
            .read()
            .await
            .iter()
            .find(|e| e.is_active() && e.path == path)
            .cloned()
    }

    /// Append a resolver to an endpoint.
    pub async fn add_resolver(
        &self,
        endpoint_id: &str,
        draft: GraphQLResolverDraft,
    ) -> Result<GraphQLResolver> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .iter_mut()
            .find(|e| e.id == endpoint_id)
            .ok_or_else(|| Error::not_found(format!("GraphQL endpoint not found: {}", endpoint_id)))?;
        let resolver = draft.build();
        endpoint.resolvers.push(resolver.clone());
        endpoint.updated_at = Utc::now();
        Ok(resolver)
    }

    /// Replace a resolver definition.
    pub async fn update_resolver(
        &self,
        endpoint_id: &str,
        resolver_id: &str,
        draft: GraphQLResolverDraft,
    ) -> Result<GraphQLResolver> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .iter_mut()
            .find(|e| e.id == endpoint_id)
            .ok_or_else(|| Error::not_found(format!("GraphQL endpoint not found: {}", endpoint_id)))?;
        let slot = endpoint
            .resolvers
            .iter_mut()
            .find(|r| r.id == resolver_id)
            .ok_or_else(|| Error::not_found(format!("Resolver not found: {}", resolver_id)))?;
        let mut resolver = draft.build();
        resolver.id = slot.id.clone();
        *slot = resolver.clone();
        endpoint.updated_at = Utc::now();
        Ok(resolver)
    }

    /// Remove a resolver.
    pub async fn delete_resolver(&self, endpoint_id: &str, resolver_id: &str) -> Result<()> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .iter_mut()
            .find(|e| e.id == endpoint_id)
            .ok_or_else(|| Error::not_found(format!("GraphQL endpoint not found: {}", endpoint_id)))?;
        let before = endpoint.resolvers.len();
        endpoint.resolvers.retain(|r| r.id != resolver_id);
        if endpoint.resolvers.len() == before {
            return Err(Error::not_found(format!("Resolver not found: {}", resolver_id)));
        }
        endpoint.updated_at = Utc::now();
        Ok(())
    }

    /// Execute a request against an endpoint, returning the response
    /// body. The HTTP status is always 200 here; invalid request bodies
    /// are rejected before execution.
    pub async fn execute(&self, endpoint: &GraphQLEndpoint, request: &GraphQLRequest) -> Value {
        let started = Instant::now();
        let parsed = parse_operation(&request.query);
        let operation_type = parsed.as_ref().map(|(t, _)| *t);
        let parsed_name = parsed.and_then(|(_, n)| n);
        let operation_name = request.operation_name.clone().or(parsed_name);

        let matched = endpoint
            .resolvers
            .iter()
            .filter(|r| r.enabled)
            .find(|r| resolver_matches(r, operation_name.as_deref(), operation_type, request));

        let body = match matched {
            Some(resolver) => {
                if let Some(delay_ms) = resolver.delay_ms {
                    if delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                let mut body = json!({"data": resolver.response_data});
                if let Some(errors) = &resolver.errors {
                    body["errors"] = json!(errors);
                }
                debug!(endpoint_id = %endpoint.id, resolver_id = %resolver.id, "graphql resolver matched");
                body
            }
            None => match &endpoint.default_response {
                Some(default) => default.clone(),
                None => {
                    let name = operation_name.as_deref().unwrap_or("anonymous");
                    let kind = operation_type
                        .map(|t| t.to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    json!({
                        "errors": [{
                            "message": format!("No resolver found for operation: {} ({})", name, kind)
                        }]
                    })
                }
            },
        };

        self.log(GraphQLLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            endpoint_id: endpoint.id.clone(),
            path: endpoint.path.clone(),
            operation_name,
            operation_type,
            resolver_id: matched.map(|r| r.id.clone()),
            response_time_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        })
        .await;

        body
    }

    async fn log(&self, entry: GraphQLLogEntry) {
        let mut logs = self.logs.write().await;
        logs.push_front(entry);
        while logs.len() > self.max_logs {
            logs.pop_back();
        }
    }

    /// Recent operations, newest first.
    pub async fn logs(&self, limit: Option<usize>) -> Vec<GraphQLLogEntry> {
        let logs = self.logs.read().await;
        logs.iter().take(limit.unwrap_or(logs.len())).cloned().collect()
    }

    /// Drop every log entry.
    pub async fn clear_logs(&self) -> usize {
        let mut logs = self.logs.write().await;
        let count = logs.len();
        logs.clear();
        count
    }
}

fn resolver_matches(
    resolver: &GraphQLResolver,
    operation_name: Option<&str>,
    operation_type: Option<OperationType>,
    request: &GraphQLRequest,
) -> bool {
    if let Some(name) = operation_name {
        if resolver.operation_name.as_deref() != Some(name) {
            return false;
        }
    }
    if let (Some(kind), Some(resolver_kind)) = (operation_type, resolver.operation_type) {
        if kind != resolver_kind {
            return false;
        }
    }
    if let Some(expected) = &resolver.variables_match {
        let empty = Map::new();
        let variables = request.variables.as_ref().unwrap_or(&empty);
        for (key, value) in expected {
            if variables.get(key) != Some(value) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_draft(name: &str, data: Value) -> GraphQLResolverDraft {
        GraphQLResolverDraft {
            operation_name: Some(name.to_string()),
            operation_type: Some(OperationType::Query),
            variables_match: None,
            response_data: data,
            errors: None,
            delay_ms: None,
            enabled: true,
        }
    }

    fn endpoint_draft(resolvers: Vec<GraphQLResolverDraft>) -> GraphQLEndpointDraft {
        GraphQLEndpointDraft {
            path: "/graphql".to_string(),
            status: Default::default(),
            resolvers,
            default_response: None,
        }
    }

    fn request(query: &str) -> GraphQLRequest {
        GraphQLRequest {
            query: query.to_string(),
            operation_name: None,
            variables: None,
        }
    }

    #[tokio::test]
    async fn test_resolver_selected_by_name_and_type() {
        let registry = GraphQLRegistry::new();
        let endpoint = registry
            .create_endpoint(endpoint_draft(vec![
                resolver_draft("GetUsers", json!([{"id": 1}])),
                resolver_draft("GetPosts", json!([{"id": "p1"}])),
            ]))
            .await
            .unwrap();

        let body = registry.execute(&endpoint, &request("query GetPosts { posts { id } }")).await;
        assert_eq!(body["data"][0]["id"], "p1");

        // Mutations never match query resolvers.
        let body = registry
            .execute(&endpoint, &request("mutation GetPosts { x }"))
            .await;
        assert!(body.get("errors").is_some());
    }

    #[tokio::test]
    async fn test_explicit_operation_name_wins() {
        let registry = GraphQLRegistry::new();
        let endpoint = registry
            .create_endpoint(endpoint_draft(vec![resolver_draft("Chosen", json!({"ok": 1}))]))
            .await
            .unwrap();

        let req = GraphQLRequest {
            query: "query Other { x }".to_string(),
            operation_name: Some("Chosen".to_string()),
            variables: None,
        };
        let body = registry.execute(&endpoint, &req).await;
        assert_eq!(body["data"]["ok"], 1);
    }

    #[tokio::test]
    async fn test_variables_must_match_exactly() {
        let registry = GraphQLRegistry::new();
        let mut draft = resolver_draft("GetUser", json!({"name": "ada"}));
        let mut expected = Map::new();
        expected.insert("id".to_string(), json!(42));
        draft.variables_match = Some(expected);
        let endpoint = registry.create_endpoint(endpoint_draft(vec![draft])).await.unwrap();

        let mut variables = Map::new();
        variables.insert("id".to_string(), json!(42));
        let req = GraphQLRequest {
            query: "query GetUser($id: ID!) { user(id: $id) { name } }".to_string(),
            operation_name: None,
            variables: Some(variables),
        };
        let body = registry.execute(&endpoint, &req).await;
        assert_eq!(body["data"]["name"], "ada");

        let mut wrong = Map::new();
        wrong.insert("id".to_string(), json!(7));
        let req = GraphQLRequest {
            query: "query GetUser { user { name } }".to_string(),
            operation_name: None,
            variables: Some(wrong),
        };
        let body = registry.execute(&endpoint, &req).await;
        assert!(body.get("errors").is_some());
    }

    #[tokio::test]
    async fn test_default_response_and_error_envelope() {
        let registry = GraphQLRegistry::new();
        let mut draft = endpoint_draft(vec![]);
        draft.default_response = Some(json!({"data": {"fallback": true}}));
        let endpoint = registry.create_endpoint(draft).await.unwrap();

        let body = registry.execute(&endpoint, &request("query Nope { x }")).await;
        assert_eq!(body["data"]["fallback"], true);

        let bare = registry.create_endpoint(endpoint_draft(vec![])).await.unwrap();
        let body = registry.execute(&bare, &request("query Nope { x }")).await;
        let message = body["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("No resolver found for operation: Nope (query)"));
    }

    #[tokio::test]
    async fn test_disabled_resolvers_skipped() {
        let registry = GraphQLRegistry::new();
        let mut disabled = resolver_draft("Op", json!({"from": "disabled"}));
        disabled.enabled = false;
        let fallback = resolver_draft("Op", json!({"from": "enabled"}));
        let endpoint = registry
            .create_endpoint(endpoint_draft(vec![disabled, fallback]))
            .await
            .unwrap();

        let body = registry.execute(&endpoint, &request("query Op { x }")).await;
        assert_eq!(body["data"]["from"], "enabled");
    }

    #[tokio::test]
    async fn test_resolver_crud() {
        let registry = GraphQLRegistry::new();
        let endpoint = registry.create_endpoint(endpoint_draft(vec![])).await.unwrap();

        let resolver = registry
            .add_resolver(&endpoint.id, resolver_draft("A", json!(1)))
            .await
            .unwrap();
        assert_eq!(registry.get_endpoint(&endpoint.id).await.unwrap().resolvers.len(), 1);

        let updated = registry
            .update_resolver(&endpoint.id, &resolver.id, resolver_draft("B", json!(2)))
            .await
            .unwrap();
        assert_eq!(updated.id, resolver.id);
        assert_eq!(updated.operation_name.as_deref(), Some("B"));

        registry.delete_resolver(&endpoint.id, &resolver.id).await.unwrap();
        assert!(registry.delete_resolver(&endpoint.id, &resolver.id).await.is_err());
    }

    #[tokio::test]
    async fn test_logs_capped_and_newest_first() {
        let registry = GraphQLRegistry::new();
        let endpoint = registry.create_endpoint(endpoint_draft(vec![])).await.unwrap();
        for i in 0..5 {
            let q = format!("query Op{} {{ x }}", i);
            registry.execute(&endpoint, &request(&q)).await;
        }
        let logs = registry.logs(Some(3)).await;
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].operation_name.as_deref(), Some("Op4"));
    }
}
