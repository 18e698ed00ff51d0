//! Ring-buffered request logging
//!
//! Every mock request appends one entry; the buffer keeps the newest
//! `max_logs` entries (default 1000) and reads newest-first. Appends are
//! best-effort from the caller's perspective: a full buffer discards the
//! oldest entries, never the request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Sentinel endpoint id for requests that matched nothing
pub const ENDPOINT_NOT_FOUND: &str = "not-found";
/// Sentinel endpoint id for requests that failed in the pipeline
pub const ENDPOINT_ERROR: &str = "error";

/// One logged mock request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLog {
    /// Unique log entry id
    pub id: String,
    /// Matched endpoint id, or `not-found` / `error`
    pub endpoint_id: String,
    /// HTTP method
    pub method: String,
    /// Request path
    pub path: String,
    /// Full request URL
    pub url: String,
    /// Query parameters
    #[serde(default)]
    pub query_params: HashMap<String, String>,
    /// Request headers
    #[serde(default)]
    pub request_headers: HashMap<String, String>,
    /// Parsed request body, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Response status
    pub response_status: u16,
    /// Response body as sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
    /// Observed handling time in milliseconds
    pub response_time_ms: u64,
    /// When the request arrived
    pub timestamp: DateTime<Utc>,
    /// Client IP, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Client user agent, if sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Filters for reading the log
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    /// Restrict to one endpoint id
    pub endpoint_id: Option<String>,
    /// Restrict to one method
    pub method: Option<String>,
    /// Restrict to one response status
    pub status: Option<u16>,
    /// Substring match on the path
    pub path_contains: Option<String>,
    /// Inclusive lower bound
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound
    pub to: Option<DateTime<Utc>>,
    /// Maximum entries returned
    pub limit: Option<usize>,
}

/// Aggregate statistics over the buffered log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    /// Entries currently buffered
    pub total: usize,
    /// Counts per method
    pub by_method: HashMap<String, u64>,
    /// Counts per status code
    pub by_status: HashMap<u16, u64>,
    /// Mean response time in milliseconds
    pub avg_response_time_ms: f64,
}

/// Shared, capped request log
#[derive(Debug, Clone)]
pub struct RequestLogger {
    logs: Arc<RwLock<VecDeque<RequestLog>>>,
    max_logs: usize,
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl RequestLogger {
    /// Create a logger keeping at most `max_logs` entries.
    pub fn new(max_logs: usize) -> Self {
        Self {
            logs: Arc::new(RwLock::new(VecDeque::new())),
            max_logs,
        }
    }

    /// Append an entry, discarding the oldest beyond the cap.
    pub async fn append(&self, entry: RequestLog) {
        let mut logs = self.logs.write().await;
        logs.push_front(entry);
        while logs.len() > self.max_logs {
            logs.pop_back();
        }
    }

    /// Read entries newest-first, applying the query filters.
    pub async fn query(&self, query: &LogQuery) -> Vec<RequestLog> {
        let logs = self.logs.read().await;
        logs.iter()
            .filter(|log| {
                query.endpoint_id.as_deref().is_none_or(|id| log.endpoint_id == id)
                    && query.method.as_deref().is_none_or(|m| log.method.eq_ignore_ascii_case(m))
                    && query.status.is_none_or(|s| log.response_status == s)
                    && query
                        .path_contains
                        .as_deref()
                        .is_none_or(|p| log.path.contains(p))
                    && query.from.is_none_or(|from| log.timestamp >= from)
                    && query.to.is_none_or(|to| log.timestamp <= to)
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Number of buffered entries.
    pub async fn len(&self) -> usize {
        self.logs.read().await.len()
    }

    /// True when nothing is buffered.
    pub async fn is_empty(&self) -> bool {
        self.logs.read().await.is_empty()
    }

    /// Drop every entry, returning how many were removed.
    pub async fn clear(&self) -> usize {
        let mut logs = self.logs.write().await;
        let count = logs.len();
        logs.clear();
        count
    }

    /// Aggregate statistics over the buffer.
    pub async fn stats(&self) -> LogStats {
        let logs = self.logs.read().await;
        let mut by_method: HashMap<String, u64> = HashMap::new();
        let mut by_status: HashMap<u16, u64> = HashMap::new();
        let mut total_time: u64 = 0;
        for log in logs.iter() {
            *by_method.entry(log.method.clone()).or_insert(0) += 1;
            *by_status.entry(log.response_status).or_insert(0) += 1;
            total_time += log.response_time_ms;
        }
        let avg_response_time_ms = if logs.is_empty() {
            0.0
        } else {
            total_time as f64 / logs.len() as f64
        };
        LogStats {
            total: logs.len(),
            by_method,
            by_status,
            avg_response_time_ms,
        }
    }
}

impl RequestLog {
    /// Build an entry with a fresh id and the current timestamp.
    pub fn new(endpoint_id: impl Into<String>, method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.into(),
            method: method.into(),
            url: path.clone(),
            path,
            query_params: HashMap::new(),
            request_headers: HashMap::new(),
            request_body: None,
            response_status: 0,
            response_data: None,
            response_time_ms: 0,
            timestamp: Utc::now(),
            client_ip: None,
            user_agent: None,
        }
    }
}
