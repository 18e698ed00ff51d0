//! GraphQL endpoint and resolver model, plus operation parsing

use chrono::{DateTime, Utc};
use mockhive_core::EndpointStatus;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// GraphQL operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Read operation
    Query,
    /// Write operation
    Mutation,
    /// Streaming operation
    Subscription,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        };
        f.write_str(s)
    }
}

static OPERATION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(query|mutation|subscription)\b\s*([A-Za-z_][A-Za-z0-9_]*)?")
        .expect("operation head regex is valid")
});

/// Parse the leading operation declaration of a GraphQL document.
/// A document starting with `{` is shorthand for an anonymous query.
pub fn parse_operation(query: &str) -> Option<(OperationType, Option<String>)> {
    if let Some(caps) = OPERATION_HEAD.captures(query) {
        let operation_type = match caps.get(1).map(|m| m.as_str()) {
            Some("query") => OperationType::Query,
            Some("mutation") => OperationType::Mutation,
            Some("subscription") => OperationType::Subscription,
            _ => return None,
        };
        let name = caps.get(2).map(|m| m.as_str().to_string());
        return Some((operation_type, name));
    }
    if query.trim_start().starts_with('{') {
        return Some((OperationType::Query, None));
    }
    None
}

/// One mock resolver: matched by operation name/type and variable
/// equality, first match wins
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLResolver {
    /// Resolver id
    pub id: String,
    /// Operation name this resolver answers; `None` matches any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    /// Operation type this resolver answers; `None` matches any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,
    /// Variables that must be present with identical values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_match: Option<Map<String, Value>>,
    /// Payload placed under `data`
    #[serde(default)]
    pub response_data: Value,
    /// Optional `errors` array returned alongside the data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    /// Delay before responding, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    /// Disabled resolvers are skipped
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Resolver fields supplied by the admin surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLResolverDraft {
    /// Operation name to answer
    #[serde(default)]
    pub operation_name: Option<String>,
    /// Operation type to answer
    #[serde(default)]
    pub operation_type: Option<OperationType>,
    /// Required variable values
    #[serde(default)]
    pub variables_match: Option<Map<String, Value>>,
    /// Payload placed under `data`
    #[serde(default)]
    pub response_data: Value,
    /// Optional `errors` array
    #[serde(default)]
    pub errors: Option<Vec<Value>>,
    /// Delay in milliseconds
    #[serde(default)]
    pub delay_ms: Option<u64>,
    /// Whether the resolver participates in matching
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl GraphQLResolverDraft {
    /// Materialise the draft with a fresh id.
    pub fn build(self) -> GraphQLResolver {
        GraphQLResolver {
            id: uuid::Uuid::new_v4().to_string(),
            operation_name: self.operation_name,
            operation_type: self.operation_type,
            variables_match: self.variables_match,
            response_data: self.response_data,
            errors: self.errors,
            delay_ms: self.delay_ms,
            enabled: self.enabled,
        }
    }
}

/// A registered GraphQL mock endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLEndpoint {
    /// Opaque unique identifier
    pub id: String,
    /// POST path answering GraphQL requests, normalised to start with `/`
    pub path: String,
    /// Active/inactive status
    #[serde(default)]
    pub status: EndpointStatus,
    /// Ordered resolvers
    #[serde(default)]
    pub resolvers: Vec<GraphQLResolver>,
    /// Body returned when no resolver matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_response: Option<Value>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl GraphQLEndpoint {
    /// True when the endpoint answers requests.
    pub fn is_active(&self) -> bool {
        self.status == EndpointStatus::Active
    }
}

/// Endpoint fields supplied by the admin surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLEndpointDraft {
    /// POST path; a missing leading `/` is added
    pub path: String,
    /// Active/inactive status
    #[serde(default)]
    pub status: EndpointStatus,
    /// Resolver definitions
    #[serde(default)]
    pub resolvers: Vec<GraphQLResolverDraft>,
    /// Fallback body
    #[serde(default)]
    pub default_response: Option<Value>,
}

/// An incoming GraphQL request body
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQLRequest {
    /// The GraphQL document
    pub query: String,
    /// Explicit operation name; wins over the parsed one
    #[serde(default)]
    pub operation_name: Option<String>,
    /// Operation variables
    #[serde(default)]
    pub variables: Option<Map<String, Value>>,
}
