//! Endpoint model: the primary entity managed by the registry

use crate::auth::AuthConfig;
use crate::conditions::ConditionalResponse;
use crate::environment::EnvironmentOverride;
use crate::proxy::ProxyConfig;
use crate::rate_limit::RateLimitConfig;
use crate::scenario::ScenarioConfig;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// HTTP method enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum HttpMethod {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GET => "GET",
            Self::POST => "POST",
            Self::PUT => "PUT",
            Self::DELETE => "DELETE",
            Self::PATCH => "PATCH",
            Self::HEAD => "HEAD",
            Self::OPTIONS => "OPTIONS",
        };
        f.write_str(s)
    }
}

impl FromStr for HttpMethod {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::GET),
            "POST" => Ok(Self::POST),
            "PUT" => Ok(Self::PUT),
            "DELETE" => Ok(Self::DELETE),
            "PATCH" => Ok(Self::PATCH),
            "HEAD" => Ok(Self::HEAD),
            "OPTIONS" => Ok(Self::OPTIONS),
            other => Err(crate::Error::validation(format!("Unsupported HTTP method: {}", other))),
        }
    }
}

/// Whether an endpoint participates in request matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointStatus {
    /// Endpoint is matched against incoming requests
    #[default]
    Active,
    /// Endpoint is skipped by the matcher
    Inactive,
}

/// Response delay: a fixed number of milliseconds or a `{min,max}` range
/// sampled uniformly per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DelaySpec {
    /// Fixed delay in milliseconds
    Fixed(u64),
    /// Uniform random delay in `[min, max]` milliseconds
    Range {
        /// Lower bound in milliseconds
        min: u64,
        /// Upper bound in milliseconds
        max: u64,
    },
}

impl DelaySpec {
    /// Sample the delay to apply for one request, in milliseconds.
    pub fn sample(&self) -> u64 {
        match self {
            Self::Fixed(ms) => *ms,
            Self::Range { min, max } => {
                let (lo, hi) = if min <= max { (*min, *max) } else { (*max, *min) };
                rand::rng().random_range(lo..=hi)
            }
        }
    }
}

/// A response definition: status, JSON body, headers and optional delay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSpec {
    /// HTTP status code
    pub status: u16,
    /// JSON response body (templating tokens may appear in string values)
    #[serde(default)]
    pub body: serde_json::Value,
    /// Extra response headers
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    /// Response delay before the body is written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelaySpec>,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status: 200,
            body: serde_json::Value::Null,
            headers: HashMap::new(),
            delay: None,
        }
    }
}

/// A registered mock endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Opaque unique identifier
    pub id: String,
    /// HTTP method this endpoint answers
    pub method: HttpMethod,
    /// Path pattern; segments may be literals or `:name` placeholders
    pub path: String,
    /// Default response
    pub response: ResponseSpec,
    /// Conditional responses, evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditional_responses: Vec<ConditionalResponse>,
    /// Scenario rotation configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioConfig>,
    /// Upstream proxy configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    /// Per-endpoint authentication simulation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    /// Per-endpoint rate limiting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
    /// Per-environment response overrides, keyed by environment name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub environments: HashMap<String, EnvironmentOverride>,
    /// Whether the endpoint participates in matching
    #[serde(default)]
    pub status: EndpointStatus,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Endpoint {
    /// True when the endpoint should be considered by the matcher.
    pub fn is_active(&self) -> bool {
        self.status == EndpointStatus::Active
    }
}

/// Endpoint fields supplied by an admin create or update request.
/// Identifier and timestamps are owned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDraft {
    /// HTTP method
    pub method: HttpMethod,
    /// Path pattern
    pub path: String,
    /// Default response
    #[serde(default)]
    pub response: ResponseSpec,
    /// Conditional responses
    #[serde(default)]
    pub conditional_responses: Vec<ConditionalResponse>,
    /// Scenario configuration
    #[serde(default)]
    pub scenario: Option<ScenarioConfig>,
    /// Proxy configuration
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// Auth configuration
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    /// Rate limit configuration
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    /// Environment overrides
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
    /// Active/inactive status
    #[serde(default)]
    pub status: EndpointStatus,
    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
}

impl EndpointDraft {
    /// Minimal draft with a default 200 response.
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            response: ResponseSpec::default(),
            conditional_responses: Vec::new(),
            scenario: None,
            proxy: None,
            auth: None,
            rate_limit: None,
            environments: HashMap::new(),
            status: EndpointStatus::Active,
            tags: Vec::new(),
        }
    }

    /// Set the default response.
    pub fn with_response(mut self, response: ResponseSpec) -> Self {
        self.response = response;
        self
    }

    /// Validate required fields before the store accepts the draft.
    pub fn validate(&self) -> crate::Result<()> {
        if self.path.trim().is_empty() {
            return Err(crate::Error::validation("Endpoint path must not be empty"));
        }
        if !self.path.starts_with('/') {
            return Err(crate::Error::validation("Endpoint path must start with '/'"));
        }
        if self.response.status < 100 || self.response.status > 599 {
            return Err(crate::Error::validation(format!(
                "Invalid response status: {}",
                self.response.status
            )));
        }
        Ok(())
    }
}
