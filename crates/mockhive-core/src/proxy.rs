//! Upstream proxying for endpoints configured to forward instead of mock
//!
//! Forwarded responses can be cached per `method|url|body-hash` with a
//! TTL; expired entries are swept opportunistically.

use crate::request::RequestContext;
use crate::{Error, Result};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Headers copied from the incoming request onto the upstream request
const FORWARDED_HEADERS: [&str; 4] = ["authorization", "x-api-key", "accept", "accept-language"];

/// Hop-by-hop headers stripped from upstream responses
const DROPPED_RESPONSE_HEADERS: [&str; 3] =
    ["content-encoding", "transfer-encoding", "connection"];

/// One ordered path rewrite rule: the first matching regex replaces
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRewrite {
    /// Regex applied to the request path
    pub pattern: String,
    /// Replacement, `$1`-style captures allowed
    pub replacement: String,
}

/// Proxy configuration attached to an endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Whether forwarding is active
    #[serde(default)]
    pub enabled: bool,
    /// Upstream base URL
    #[serde(default)]
    pub target_url: String,
    /// Ordered rewrite rules
    #[serde(default)]
    pub path_rewrite: Vec<PathRewrite>,
    /// Static headers added to every upstream request
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Upstream timeout in seconds; defaults to 30
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    /// Cache 2xx upstream responses
    #[serde(default)]
    pub cache_response: bool,
    /// Cache TTL in seconds; defaults to 300
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl: Option<u64>,
}

impl ProxyConfig {
    /// Apply the first matching rewrite rule to `path`.
    /// Invalid patterns are skipped.
    pub fn rewrite_path(&self, path: &str) -> String {
        for rule in &self.path_rewrite {
            match Regex::new(&rule.pattern) {
                Ok(re) => {
                    if re.is_match(path) {
                        return re.replace(path, rule.replacement.as_str()).to_string();
                    }
                }
                Err(_) => {
                    warn!(pattern = %rule.pattern, "skipping invalid path rewrite pattern");
                }
            }
        }
        path.to_string()
    }

    /// Absolute upstream URL for a rewritten path and raw query string.
    pub fn target_for(&self, rewritten_path: &str, raw_query: &str) -> String {
        let base = self.target_url.trim_end_matches('/');
        if raw_query.is_empty() {
            format!("{}{}", base, rewritten_path)
        } else {
            format!("{}{}?{}", base, rewritten_path, raw_query)
        }
    }
}

/// Response produced by the forwarder
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    /// Upstream status
    pub status: u16,
    /// Upstream body: parsed JSON when the content type says so, else text
    pub body: Value,
    /// Upstream headers minus hop-by-hop ones
    pub headers: HashMap<String, String>,
    /// Whether the response came from the cache
    pub from_cache: bool,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: ProxyResponse,
    expires_at: DateTime<Utc>,
}

/// Outbound forwarder with response cache, shared across requests
#[derive(Debug, Clone)]
pub struct ProxyForwarder {
    client: Client,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl Default for ProxyForwarder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProxyForwarder {
    /// Create a forwarder with a fresh HTTP client.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Forward the request described by `ctx` per `config`.
    pub async fn forward(&self, config: &ProxyConfig, ctx: &RequestContext) -> Result<ProxyResponse> {
        if config.target_url.is_empty() {
            return Err(Error::proxy("Proxy target URL is not configured"));
        }

        let rewritten = config.rewrite_path(&ctx.path);
        let target = config.target_for(&rewritten, &ctx.raw_query);
        let cache_key = cache_key(&ctx.method, &target, ctx.body.as_ref());

        if config.cache_response {
            // Opportunistic expiry sweep.
            if rand::rng().random_bool(0.1) {
                self.sweep_expired().await;
            }
            if let Some(hit) = self.cache_lookup(&cache_key).await {
                debug!(%target, "proxy cache hit");
                return Ok(hit);
            }
        }

        let method = reqwest::Method::from_bytes(ctx.method.as_bytes())
            .map_err(|_| Error::proxy(format!("Unsupported method: {}", ctx.method)))?;
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));

        let mut request = self
            .client
            .request(method, &target)
            .timeout(timeout)
            .header("content-type", "application/json");

        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        for name in FORWARDED_HEADERS {
            if let Some(value) = ctx.header(name) {
                request = request.header(name, value);
            }
        }

        if !matches!(ctx.method.as_str(), "GET" | "HEAD") {
            if let Some(body) = &ctx.body {
                request = request.json(body);
            }
        }

        let upstream = request.send().await?;
        let status = upstream.status().as_u16();

        let mut headers = HashMap::new();
        for (name, value) in upstream.headers() {
            let name = name.as_str().to_ascii_lowercase();
            if DROPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
                continue;
            }
            if let Ok(value) = value.to_str() {
                headers.insert(name, value.to_string());
            }
        }

        let is_json = headers
            .get("content-type")
            .is_some_and(|ct| ct.contains("application/json"));
        let text = upstream.text().await?;
        let body = if is_json {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        } else {
            Value::String(text)
        };

        let response = ProxyResponse {
            status,
            body,
            headers,
            from_cache: false,
        };

        if config.cache_response && (200..300).contains(&status) {
            let ttl = config.cache_ttl.unwrap_or(300);
            let mut cache = self.cache.write().await;
            cache.insert(
                cache_key,
                CacheEntry {
                    response: response.clone(),
                    expires_at: Utc::now() + ChronoDuration::seconds(ttl as i64),
                },
            );
        }

        Ok(response)
    }

    async fn cache_lookup(&self, key: &str) -> Option<ProxyResponse> {
        let cache = self.cache.read().await;
        let entry = cache.get(key)?;
        if entry.expires_at <= Utc::now() {
            return None;
        }
        let mut response = entry.response.clone();
        response.from_cache = true;
        Some(response)
    }

    /// Drop expired cache entries.
    pub async fn sweep_expired(&self) -> usize {
        let now = Utc::now();
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|_, entry| entry.expires_at > now);
        before - cache.len()
    }

    /// Drop every cache entry.
    pub async fn clear_cache(&self) -> usize {
        let mut cache = self.cache.write().await;
        let count = cache.len();
        cache.clear();
        count
    }

    /// Number of live cache entries.
    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

fn cache_key(method: &str, url: &str, body: Option<&Value>) -> String {
    let mut hasher = Sha256::new();
    if let Some(body) = body {
        hasher.update(body.to_string().as_bytes());
    }
    let digest = hasher.finalize();
    format!("{}|{}|{:x}", method, url, digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rewrite_first_match_wins() {
        let config = ProxyConfig {
            path_rewrite: vec![
                PathRewrite {
                    pattern: "^/api".to_string(),
                    replacement: "/v2".to_string(),
                },
                PathRewrite {
                    pattern: "users".to_string(),
                    replacement: "people".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(config.rewrite_path("/api/users"), "/v2/users");
        assert_eq!(config.rewrite_path("/other/users"), "/other/people");
        assert_eq!(config.rewrite_path("/none"), "/none");
    }

    #[test]
    fn test_invalid_rewrite_pattern_skipped() {
        let config = ProxyConfig {
            path_rewrite: vec![
                PathRewrite {
                    pattern: "[broken".to_string(),
                    replacement: "/x".to_string(),
                },
                PathRewrite {
                    pattern: "^/a".to_string(),
                    replacement: "/b".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(config.rewrite_path("/a/1"), "/b/1");
    }

    #[test]
    fn test_target_joining() {
        let config = ProxyConfig {
            target_url: "http://up.example.com/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.target_for("/users", ""), "http://up.example.com/users");
        assert_eq!(
            config.target_for("/users", "page=2"),
            "http://up.example.com/users?page=2"
        );
    }

    #[test]
    fn test_cache_key_includes_body() {
        let a = cache_key("POST", "http://x/y", Some(&json!({"a": 1})));
        let b = cache_key("POST", "http://x/y", Some(&json!({"a": 2})));
        let c = cache_key("GET", "http://x/y", Some(&json!({"a": 1})));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, cache_key("POST", "http://x/y", Some(&json!({"a": 1}))));
    }

    #[tokio::test]
    async fn test_cache_sweep_and_clear() {
        let forwarder = ProxyForwarder::new();
        {
            let mut cache = forwarder.cache.write().await;
            cache.insert(
                "live".to_string(),
                CacheEntry {
                    response: ProxyResponse {
                        status: 200,
                        body: json!({}),
                        headers: HashMap::new(),
                        from_cache: false,
                    },
                    expires_at: Utc::now() + ChronoDuration::seconds(60),
                },
            );
            cache.insert(
                "stale".to_string(),
                CacheEntry {
                    response: ProxyResponse {
                        status: 200,
                        body: json!({}),
                        headers: HashMap::new(),
                        from_cache: false,
                    },
                    expires_at: Utc::now() - ChronoDuration::seconds(1),
                },
            );
        }

        assert_eq!(forwarder.sweep_expired().await, 1);
        assert_eq!(forwarder.cache_len().await, 1);
        assert!(forwarder.cache_lookup("live").await.is_some_and(|r| r.from_cache));
        assert!(forwarder.cache_lookup("stale").await.is_none());
        assert_eq!(forwarder.clear_cache().await, 1);
    }

    #[tokio::test]
    async fn test_missing_target_is_an_error() {
        let forwarder = ProxyForwarder::new();
        let config = ProxyConfig {
            enabled: true,
            ..Default::default()
        };
        let result = forwarder.forward(&config, &RequestContext::default()).await;
        assert!(result.is_err());
    }
}
