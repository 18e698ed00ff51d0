//! The in-memory endpoint store: single authority on shared mock state
//!
//! Endpoints live in a `Vec` to preserve insertion order, which the
//! matcher relies on. All reads hand out clones; mutations go through
//! the write lock and schedule a persistence snapshot. Scenario counters
//! sit behind their own lock so the request hot path never contends with
//! admin mutations.

use crate::endpoint::{Endpoint, EndpointDraft, HttpMethod};
use crate::history::{diff_fields, HistoryAction, HistoryEntry, HistoryLog};
use crate::matcher;
use crate::persistence;
use crate::scenario::{ScenarioConfig, ScenarioCounter};
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug)]
struct Inner {
    endpoints: Vec<Endpoint>,
    history: HistoryLog,
}

/// Concurrency-safe endpoint registry with history and scenario counters
#[derive(Debug, Clone)]
pub struct EndpointStore {
    inner: Arc<RwLock<Inner>>,
    counters: Arc<RwLock<HashMap<String, ScenarioCounter>>>,
    persist_path: Option<PathBuf>,
}

impl Default for EndpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointStore {
    /// Create an empty, non-persistent store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                endpoints: Vec::new(),
                history: HistoryLog::default(),
            })),
            counters: Arc::new(RwLock::new(HashMap::new())),
            persist_path: None,
        }
    }

    /// Create a store persisted at `path`, loading any existing snapshot.
    pub async fn with_persistence(path: PathBuf) -> Self {
        let endpoints = persistence::load_snapshot(&path).await;
        info!(count = endpoints.len(), path = %path.display(), "endpoint store initialised");
        Self {
            inner: Arc::new(RwLock::new(Inner {
                endpoints,
                history: HistoryLog::default(),
            })),
            counters: Arc::new(RwLock::new(HashMap::new())),
            persist_path: Some(path),
        }
    }

    fn build(draft: EndpointDraft) -> Endpoint {
        let now = Utc::now();
        Endpoint {
            id: uuid::Uuid::new_v4().to_string(),
            method: draft.method,
            path: draft.path,
            response: draft.response,
            conditional_responses: draft.conditional_responses,
            scenario: draft.scenario,
            proxy: draft.proxy,
            auth: draft.auth,
            rate_limit: draft.rate_limit,
            environments: draft.environments,
            status: draft.status,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        }
    }

    /// Register a new endpoint.
    pub async fn create(&self, draft: EndpointDraft) -> Result<Endpoint> {
        draft.validate()?;
        let endpoint = Self::build(draft);
        {
            let mut inner = self.inner.write().await;
            inner.history.record(
                &endpoint.id,
                HistoryAction::Created,
                endpoint.clone(),
                Vec::new(),
            );
            inner.endpoints.push(endpoint.clone());
        }
        self.schedule_save().await;
        Ok(endpoint)
    }

    /// Fetch one endpoint by id.
    pub async fn get(&self, id: &str) -> Option<Endpoint> {
        let inner = self.inner.read().await;
        inner.endpoints.iter().find(|e| e.id == id).cloned()
    }

    /// All endpoints in insertion order.
    pub async fn list(&self) -> Vec<Endpoint> {
        self.inner.read().await.endpoints.clone()
    }

    /// Replace the mutable fields of an endpoint.
    pub async fn update(&self, id: &str, draft: EndpointDraft) -> Result<Endpoint> {
        draft.validate()?;
        let updated = {
            let mut inner = self.inner.write().await;
            let position = inner
                .endpoints
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| Error::not_found(format!("Endpoint not found: {}", id)))?;

            let before = inner.endpoints[position].clone();
            let mut updated = Self::build(draft);
            updated.id = before.id.clone();
            updated.created_at = before.created_at;
            updated.updated_at = Utc::now();

            let changes = diff_fields(&before, &updated);
            inner
                .history
                .record(id, HistoryAction::Updated, updated.clone(), changes);
            inner.endpoints[position] = updated.clone();
            updated
        };
        self.schedule_save().await;
        Ok(updated)
    }

    /// Remove an endpoint, returning its final state.
    pub async fn delete(&self, id: &str) -> Result<Endpoint> {
        let removed = {
            let mut inner = self.inner.write().await;
            let position = inner
                .endpoints
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| Error::not_found(format!("Endpoint not found: {}", id)))?;
            let removed = inner.endpoints.remove(position);
            inner
                .history
                .record(id, HistoryAction::Deleted, removed.clone(), Vec::new());
            removed
        };
        self.counters.write().await.remove(id);
        self.schedule_save().await;
        Ok(removed)
    }

    /// Resolve a request path to the first matching active endpoint,
    /// binding its path parameters.
    pub async fn find_by_path(
        &self,
        method: HttpMethod,
        path: &str,
    ) -> Option<(Endpoint, HashMap<String, String>)> {
        let inner = self.inner.read().await;
        let candidates: Vec<&Endpoint> = inner
            .endpoints
            .iter()
            .filter(|e| e.is_active() && e.method == method)
            .collect();
        let patterns: Vec<&str> = candidates.iter().map(|e| e.path.as_str()).collect();
        let found = matcher::find_match(&patterns, path)?;
        Some((candidates[found.index].clone(), found.params))
    }

    /// Read-then-increment the scenario counter for an endpoint,
    /// applying the configured auto-reset first. Returns the value this
    /// request observed.
    pub async fn scenario_advance(&self, endpoint_id: &str, config: &ScenarioConfig) -> u64 {
        let now = Utc::now();
        let mut counters = self.counters.write().await;
        let counter = counters.entry(endpoint_id.to_string()).or_default();

        if config.reset_after > 0 {
            let idle = (now - counter.last_access).num_seconds();
            if idle >= 0 && idle as u64 >= config.reset_after {
                counter.count = 0;
            }
        }

        let observed = counter.count;
        counter.count += 1;
        counter.last_access = now;
        observed
    }

    /// Snapshot of all scenario counters.
    pub async fn scenario_counters(&self) -> HashMap<String, ScenarioCounter> {
        self.counters.read().await.clone()
    }

    /// Reset one endpoint's counter. Returns whether one existed.
    pub async fn scenario_reset(&self, endpoint_id: &str) -> bool {
        self.counters.write().await.remove(endpoint_id).is_some()
    }

    /// Reset every counter, returning how many were dropped.
    pub async fn scenario_reset_all(&self) -> usize {
        let mut counters = self.counters.write().await;
        let count = counters.len();
        counters.clear();
        count
    }

    /// History entries for one endpoint, newest first.
    pub async fn history_for_endpoint(&self, endpoint_id: &str) -> Vec<HistoryEntry> {
        self.inner.read().await.history.for_endpoint(endpoint_id)
    }

    /// Most recent history entries across all endpoints.
    pub async fn history_recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.inner.read().await.history.recent(limit)
    }

    /// Restore an endpoint to the state captured by a history entry.
    /// Recreates the endpoint when it has since been deleted.
    pub async fn restore(&self, history_id: &str) -> Result<Endpoint> {
        let restored = {
            let mut inner = self.inner.write().await;
            let entry = inner
                .history
                .get(history_id)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("History entry not found: {}", history_id)))?;

            let mut restored = entry.snapshot.clone();
            restored.updated_at = Utc::now();

            let changes = match inner.endpoints.iter().position(|e| e.id == restored.id) {
                Some(position) => {
                    let changes = diff_fields(&inner.endpoints[position], &restored);
                    inner.endpoints[position] = restored.clone();
                    changes
                }
                None => {
                    inner.endpoints.push(restored.clone());
                    Vec::new()
                }
            };
            inner.history.record(
                &restored.id,
                HistoryAction::Restored,
                restored.clone(),
                changes,
            );
            restored
        };
        self.schedule_save().await;
        Ok(restored)
    }

    /// Bulk-import endpoints: merge by id, or replace the registry.
    pub async fn import(&self, endpoints: Vec<Endpoint>, merge: bool) -> usize {
        let imported = endpoints.len();
        {
            let mut inner = self.inner.write().await;
            if merge {
                for endpoint in endpoints {
                    match inner.endpoints.iter().position(|e| e.id == endpoint.id) {
                        Some(position) => inner.endpoints[position] = endpoint,
                        None => inner.endpoints.push(endpoint),
                    }
                }
            } else {
                inner.endpoints = endpoints;
            }
        }
        self.schedule_save().await;
        imported
    }

    /// Write a snapshot now. Used at shutdown.
    pub async fn flush(&self) -> Result<()> {
        let Some(path) = self.persist_path.clone() else {
            return Ok(());
        };
        let endpoints = self.list().await;
        persistence::save_snapshot(&path, &endpoints).await
    }

    async fn schedule_save(&self) {
        let Some(path) = self.persist_path.clone() else {
            return;
        };
        let endpoints = self.list().await;
        tokio::spawn(async move {
            if let Err(e) = persistence::save_snapshot(&path, &endpoints).await {
                warn!(error = %e, "scheduled endpoint snapshot failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::ResponseSpec;
    use crate::scenario::ScenarioMode;
    use serde_json::json;

    fn draft(method: HttpMethod, path: &str) -> EndpointDraft {
        EndpointDraft::new(method, path).with_response(ResponseSpec {
            status: 200,
            body: json!({"path": path}),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let store = EndpointStore::new();

        let created = store.create(draft(HttpMethod::GET, "/api/users")).await.unwrap();
        assert!(store.get(&created.id).await.is_some());

        let updated = store
            .update(&created.id, draft(HttpMethod::GET, "/api/people"))
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.path, "/api/people");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);

        store.delete(&created.id).await.unwrap();
        assert!(store.get(&created.id).await.is_none());
        assert!(store.delete(&created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let store = EndpointStore::new();
        let mut seen = std::collections::HashSet::new();
        for i in 0..100 {
            let e = store.create(draft(HttpMethod::GET, &format!("/p/{}", i))).await.unwrap();
            assert!(seen.insert(e.id));
        }
    }

    #[tokio::test]
    async fn test_find_by_path_respects_order_and_status() {
        let store = EndpointStore::new();
        let param = store.create(draft(HttpMethod::GET, "/api/users/:id")).await.unwrap();
        let exact = store.create(draft(HttpMethod::GET, "/api/users/me")).await.unwrap();

        // Exact wins even though the parametric endpoint registered first.
        let (found, params) = store.find_by_path(HttpMethod::GET, "/api/users/me").await.unwrap();
        assert_eq!(found.id, exact.id);
        assert!(params.is_empty());

        let (found, params) = store.find_by_path(HttpMethod::GET, "/api/users/42").await.unwrap();
        assert_eq!(found.id, param.id);
        assert_eq!(params.get("id").map(String::as_str), Some("42"));

        // Wrong method misses.
        assert!(store.find_by_path(HttpMethod::POST, "/api/users/me").await.is_none());

        // Inactive endpoints are skipped.
        let mut inactive = draft(HttpMethod::GET, "/api/users/:id");
        inactive.status = crate::endpoint::EndpointStatus::Inactive;
        store.update(&param.id, inactive).await.unwrap();
        assert!(store.find_by_path(HttpMethod::GET, "/api/users/42").await.is_none());
    }

    #[tokio::test]
    async fn test_scenario_counter_is_read_then_increment() {
        let store = EndpointStore::new();
        let config = ScenarioConfig {
            enabled: true,
            mode: ScenarioMode::Sequential,
            responses: vec![],
            reset_after: 0,
            looped: true,
        };
        assert_eq!(store.scenario_advance("ep", &config).await, 0);
        assert_eq!(store.scenario_advance("ep", &config).await, 1);
        assert_eq!(store.scenario_advance("ep", &config).await, 2);

        assert!(store.scenario_reset("ep").await);
        assert_eq!(store.scenario_advance("ep", &config).await, 0);
    }

    #[tokio::test]
    async fn test_scenario_counter_total_order_under_concurrency() {
        let store = Arc::new(EndpointStore::new());
        let config = ScenarioConfig {
            enabled: true,
            mode: ScenarioMode::Sequential,
            responses: vec![],
            reset_after: 0,
            looped: true,
        };

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                store.scenario_advance("ep", &config).await
            }));
        }
        let mut observed: Vec<u64> = Vec::new();
        for handle in handles {
            observed.push(handle.await.unwrap());
        }
        observed.sort_unstable();
        let expected: Vec<u64> = (0..20).collect();
        assert_eq!(observed, expected);
    }

    #[tokio::test]
    async fn test_history_and_restore() {
        let store = EndpointStore::new();
        let created = store.create(draft(HttpMethod::GET, "/v1")).await.unwrap();
        store.update(&created.id, draft(HttpMethod::GET, "/v2")).await.unwrap();

        let entries = store.history_for_endpoint(&created.id).await;
        assert_eq!(entries.len(), 2);

        // Restore the creation snapshot: path goes back to /v1.
        let creation_entry = entries.last().unwrap().clone();
        let restored = store.restore(&creation_entry.id).await.unwrap();
        assert_eq!(restored.path, "/v1");
        assert_eq!(store.get(&created.id).await.unwrap().path, "/v1");

        // Restoring after delete recreates the endpoint.
        store.delete(&created.id).await.unwrap();
        let restored = store.restore(&creation_entry.id).await.unwrap();
        assert_eq!(restored.id, created.id);
        assert!(store.get(&created.id).await.is_some());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("endpoints.json");

        let store = EndpointStore::with_persistence(path.clone()).await;
        let created = store.create(draft(HttpMethod::POST, "/orders")).await.unwrap();
        store.flush().await.unwrap();

        let reloaded = EndpointStore::with_persistence(path).await;
        let endpoints = reloaded.list().await;
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].id, created.id);
        assert_eq!(endpoints[0].method, HttpMethod::POST);
    }

    #[tokio::test]
    async fn test_import_merge_and_replace() {
        let store = EndpointStore::new();
        let kept = store.create(draft(HttpMethod::GET, "/keep")).await.unwrap();

        let mut incoming = kept.clone();
        incoming.path = "/kept-updated".to_string();
        let fresh = {
            let mut e = kept.clone();
            e.id = uuid::Uuid::new_v4().to_string();
            e.path = "/fresh".to_string();
            e
        };

        store.import(vec![incoming, fresh.clone()], true).await;
        let endpoints = store.list().await;
        assert_eq!(endpoints.len(), 2);
        assert_eq!(store.get(&kept.id).await.unwrap().path, "/kept-updated");

        store.import(vec![fresh], false).await;
        assert_eq!(store.list().await.len(), 1);
    }
}
