//! Fixed-window rate limiting keyed by client IP, header or query value

use crate::request::RequestContext;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// How the counter key is derived from a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitKeyBy {
    /// Client IP address
    #[default]
    Ip,
    /// Value of the header named by `key_name`
    Header,
    /// Value of the query parameter named by `key_name`
    Query,
}

/// Rate limit configuration attached to an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitConfig {
    /// Requests allowed per window
    pub requests_per_window: u32,
    /// Window length in seconds
    pub window_seconds: u64,
    /// Extra requests tolerated beyond the window allowance
    #[serde(default)]
    pub burst_limit: u32,
    /// Key derivation strategy
    #[serde(default)]
    pub key_by: RateLimitKeyBy,
    /// Header or query parameter name for non-IP keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    /// Status returned when limited; defaults to 429
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_status: Option<u16>,
    /// Body returned when limited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_body: Option<Value>,
}

impl RateLimitConfig {
    /// Derive the counter key for a request.
    pub fn key_for(&self, ctx: &RequestContext) -> String {
        match self.key_by {
            RateLimitKeyBy::Ip => {
                ctx.client_ip.clone().unwrap_or_else(|| "unknown".to_string())
            }
            RateLimitKeyBy::Header => self
                .key_name
                .as_deref()
                .and_then(|name| ctx.header(name))
                .map_or_else(|| "no-key".to_string(), str::to_string),
            RateLimitKeyBy::Query => self
                .key_name
                .as_deref()
                .and_then(|name| ctx.query_param(name))
                .map_or_else(|| "no-key".to_string(), str::to_string),
        }
    }
}

#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start_ms: i64,
    last_seen_ms: i64,
}

/// Outcome of a rate limit check, including the header values to attach
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Window allowance (`requestsPerWindow`)
    pub limit: u32,
    /// Requests left in the window, burst included
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_seconds: u64,
}

/// Per-endpoint counter summary used by the admin stats surface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitKeyStats {
    /// Endpoint the counter belongs to
    pub endpoint_id: String,
    /// Derived key
    pub key: String,
    /// Requests counted in the current window
    pub count: u32,
    /// Window start, milliseconds since epoch
    pub window_start: i64,
}

/// Fixed-window rate limiter shared across requests
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<(String, String), WindowState>>>,
}

impl RateLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and count a request for `(endpoint_id, key)`.
    pub async fn check(
        &self,
        endpoint_id: &str,
        config: &RateLimitConfig,
        key: String,
    ) -> RateLimitDecision {
        let now = Utc::now().timestamp_millis();
        let window_ms = (config.window_seconds as i64).saturating_mul(1000);
        let allowance = config.requests_per_window.saturating_add(config.burst_limit);

        let mut windows = self.windows.write().await;
        let state = windows
            .entry((endpoint_id.to_string(), key))
            .or_insert(WindowState {
                count: 0,
                window_start_ms: now,
                last_seen_ms: now,
            });

        if now - state.window_start_ms >= window_ms {
            state.count = 0;
            state.window_start_ms = now;
        }
        state.last_seen_ms = now;

        let allowed = state.count < allowance;
        if allowed {
            state.count += 1;
        }

        let remaining = allowance.saturating_sub(state.count);
        let elapsed_ms = now - state.window_start_ms;
        let reset_seconds = ((window_ms - elapsed_ms).max(0) as u64).div_ceil(1000);

        RateLimitDecision {
            allowed,
            limit: config.requests_per_window,
            remaining,
            reset_seconds,
        }
    }

    /// Drop all counters for one endpoint.
    pub async fn reset_endpoint(&self, endpoint_id: &str) -> usize {
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|(eid, _), _| eid != endpoint_id);
        before - windows.len()
    }

    /// Drop every counter.
    pub async fn reset_all(&self) -> usize {
        let mut windows = self.windows.write().await;
        let count = windows.len();
        windows.clear();
        count
    }

    /// Snapshot of all live counters.
    pub async fn stats(&self) -> Vec<RateLimitKeyStats> {
        let windows = self.windows.read().await;
        windows
            .iter()
            .map(|((endpoint_id, key), state)| RateLimitKeyStats {
                endpoint_id: endpoint_id.clone(),
                key: key.clone(),
                count: state.count,
                window_start: state.window_start_ms,
            })
            .collect()
    }

    /// Remove counters idle longer than `max_idle`.
    pub async fn sweep(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now().timestamp_millis() - max_idle.as_millis() as i64;
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, state| state.last_seen_ms >= cutoff);
        let removed = before - windows.len();
        if removed > 0 {
            debug!(removed, "swept idle rate limit counters");
        }
        removed
    }

    /// Spawn the background sweeper: every `interval`, entries idle longer
    /// than one hour are dropped. The task ends when the limiter is gone.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(&self.windows);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(windows) = weak.upgrade() else {
                    break;
                };
                let limiter = RateLimiter { windows };
                limiter.sweep(Duration::from_secs(3600)).await;
            }
        })
    }
}
