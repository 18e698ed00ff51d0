//! Mutation history: immutable endpoint snapshots plus field-level diffs
//!
//! Every endpoint mutation appends one entry; entries are capped and can
//! be restored, which rewrites the endpoint back to the snapshot.

use crate::endpoint::Endpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// What kind of mutation produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    /// Endpoint was created
    Created,
    /// Endpoint was updated
    Updated,
    /// Endpoint was deleted
    Deleted,
    /// Endpoint was restored from a snapshot
    Restored,
}

/// One recorded mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Entry id
    pub id: String,
    /// Endpoint the mutation applied to
    pub endpoint_id: String,
    /// Kind of mutation
    pub action: HistoryAction,
    /// Endpoint state after the mutation (before it, for deletes)
    pub snapshot: Endpoint,
    /// Names of top-level fields that changed
    #[serde(default)]
    pub changes: Vec<String>,
    /// When the mutation happened
    pub timestamp: DateTime<Utc>,
}

/// Capped, newest-first history log. Owned by the endpoint store and
/// mutated only under its write lock.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(500)
    }
}

impl HistoryLog {
    /// Create a log keeping at most `max_entries`.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Record a mutation.
    pub fn record(
        &mut self,
        endpoint_id: &str,
        action: HistoryAction,
        snapshot: Endpoint,
        changes: Vec<String>,
    ) -> &HistoryEntry {
        self.entries.push_front(HistoryEntry {
            id: uuid::Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.to_string(),
            action,
            snapshot,
            changes,
            timestamp: Utc::now(),
        });
        while self.entries.len() > self.max_entries {
            self.entries.pop_back();
        }
        &self.entries[0]
    }

    /// Entries for one endpoint, newest first.
    pub fn for_endpoint(&self, endpoint_id: &str) -> Vec<HistoryEntry> {
        self.entries
            .iter()
            .filter(|e| e.endpoint_id == endpoint_id)
            .cloned()
            .collect()
    }

    /// Most recent entries across all endpoints.
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        self.entries.iter().take(limit).cloned().collect()
    }

    /// Find an entry by id.
    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Total buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Names of top-level fields that differ between two endpoint states.
pub fn diff_fields(before: &Endpoint, after: &Endpoint) -> Vec<String> {
    let (Ok(a), Ok(b)) = (serde_json::to_value(before), serde_json::to_value(after)) else {
        return Vec::new();
    };
    let (Value::Object(a), Value::Object(b)) = (a, b) else {
        return Vec::new();
    };

    let mut changed: Vec<String> = Vec::new();
    for (key, value) in &b {
        if key == "updatedAt" {
            continue;
        }
        if a.get(key) != Some(value) {
            changed.push(key.clone());
        }
    }
    for key in a.keys() {
        if !b.contains_key(key) && key != "updatedAt" {
            changed.push(key.clone());
        }
    }
    changed.sort();
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{EndpointDraft, EndpointStatus, HttpMethod};
    use serde_json::json;

    fn endpoint(path: &str) -> Endpoint {
        let draft = EndpointDraft::new(HttpMethod::GET, path);
        Endpoint {
            id: uuid::Uuid::new_v4().to_string(),
            method: draft.method,
            path: draft.path,
            response: draft.response,
            conditional_responses: vec![],
            scenario: None,
            proxy: None,
            auth: None,
            rate_limit: None,
            environments: Default::default(),
            status: EndpointStatus::Active,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_cap() {
        let mut log = HistoryLog::new(2);
        for i in 0..4 {
            log.record(&format!("ep-{}", i), HistoryAction::Created, endpoint("/a"), vec![]);
        }
        assert_eq!(log.len(), 2);
        assert_eq!(log.recent(10)[0].endpoint_id, "ep-3");
    }

    #[test]
    fn test_for_endpoint_filters() {
        let mut log = HistoryLog::default();
        log.record("a", HistoryAction::Created, endpoint("/a"), vec![]);
        log.record("b", HistoryAction::Created, endpoint("/b"), vec![]);
        log.record("a", HistoryAction::Updated, endpoint("/a"), vec!["path".to_string()]);

        let entries = log.for_endpoint("a");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, HistoryAction::Updated);
    }

    #[test]
    fn test_diff_fields() {
        let before = endpoint("/a");
        let mut after = before.clone();
        after.path = "/b".to_string();
        after.tags = vec!["x".to_string()];
        after.response.body = json!({"changed": true});
        after.updated_at = Utc::now();

        let changes = diff_fields(&before, &after);
        assert!(changes.contains(&"path".to_string()));
        assert!(changes.contains(&"tags".to_string()));
        assert!(changes.contains(&"response".to_string()));
        assert!(!changes.contains(&"updatedAt".to_string()));
        assert!(!changes.contains(&"method".to_string()));
    }
}
