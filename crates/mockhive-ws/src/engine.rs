//! The WebSocket mock engine: endpoint registry, connection set,
//! pattern dispatch, scheduled broadcasts and keepalive
//!
//! Connections are handles around an outbound channel; the socket task
//! owns the sink and drains the channel, so the engine never blocks on a
//! slow peer. Scheduled senders hold weak references and die with the
//! engine.

use crate::types::{normalize_path, WsEndpoint, WsEndpointDraft, WsMessage};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use mockhive_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Minutes of inactivity after which a session leaves the active view
const ACTIVE_VIEW_IDLE_MINUTES: i64 = 5;

/// Frame pushed to a connection's writer task
#[derive(Debug, Clone)]
pub enum WsOutbound {
    /// Text frame
    Text(String),
    /// Keepalive ping
    Ping,
    /// Close the socket
    Close,
}

/// Public view of one connection
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    /// Connection id
    pub connection_id: String,
    /// Endpoint the connection is attached to
    pub endpoint_id: String,
    /// Client IP, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    /// Client user agent, if sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// When the connection was accepted
    pub connected_at: DateTime<Utc>,
    /// Last frame or pong seen
    pub last_activity: DateTime<Utc>,
    /// False once a keepalive ping went unanswered
    pub is_alive: bool,
}

struct Connection {
    info: ConnectionInfo,
    sender: mpsc::UnboundedSender<WsOutbound>,
    awaiting_pong: bool,
}

/// Direction of a logged message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    /// Client → server
    Incoming,
    /// Server → client
    Outgoing,
    /// Lifecycle events
    System,
}

/// One logged WebSocket event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsLogEntry {
    /// Entry id
    pub id: String,
    /// Endpoint id
    pub endpoint_id: String,
    /// Connection id
    pub connection_id: String,
    /// Direction
    pub direction: MessageDirection,
    /// `json` when the payload parses as JSON, else `text`
    pub message_type: String,
    /// Raw payload or event description
    pub payload: String,
    /// Event time
    pub timestamp: DateTime<Utc>,
}

/// Aggregate engine statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WsStats {
    /// Registered endpoints
    pub endpoints: usize,
    /// Active endpoints
    pub active_endpoints: usize,
    /// Open connections
    pub connections: usize,
    /// Buffered log entries
    pub logs: usize,
}

/// The WebSocket mock engine
pub struct WsEngine {
    endpoints: Arc<RwLock<Vec<WsEndpoint>>>,
    connections: Arc<RwLock<HashMap<String, Connection>>>,
    logs: Arc<RwLock<VecDeque<WsLogEntry>>>,
    schedulers: Arc<RwLock<HashMap<String, Vec<JoinHandle<()>>>>>,
    max_logs: usize,
}

impl Default for WsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl WsEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self {
            endpoints: Arc::new(RwLock::new(Vec::new())),
            connections: Arc::new(RwLock::new(HashMap::new())),
            logs: Arc::new(RwLock::new(VecDeque::new())),
            schedulers: Arc::new(RwLock::new(HashMap::new())),
            max_logs: 1000,
        }
    }

    fn build(draft: WsEndpointDraft) -> WsEndpoint {
        let now = Utc::now();
        WsEndpoint {
            id: uuid::Uuid::new_v4().to_string(),
            path: normalize_path(&draft.path),
            status: draft.status,
            message_patterns: draft.message_patterns,
            on_connect_message: draft.on_connect_message,
            on_disconnect_message: draft.on_disconnect_message,
            scheduled_messages: draft.scheduled_messages,
            created_at: now,
            updated_at: now,
        }
    }

    /// Register a new endpoint and start its scheduled senders.
    pub async fn create_endpoint(&self, draft: WsEndpointDraft) -> Result<WsEndpoint> {
        if draft.path.trim().is_empty() {
            return Err(Error::validation("WebSocket endpoint path must not be empty"));
        }
        let endpoint = Self::build(draft);
        self.endpoints.write().await.push(endpoint.clone());
        self.restart_schedulers(&endpoint).await;
        info!(id = %endpoint.id, path = %endpoint.path, "websocket endpoint created");
        Ok(endpoint)
    }

    /// Replace an endpoint's definition and its scheduled senders.
    pub async fn update_endpoint(&self, id: &str, draft: WsEndpointDraft) -> Result<WsEndpoint> {
        let updated = {
            let mut endpoints = self.endpoints.write().await;
            let position = endpoints
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| Error::not_found(format!("WebSocket endpoint not found: {}", id)))?;
            let mut updated = Self::build(draft);
            updated.id = endpoints[position].id.clone();
            updated.created_at = endpoints[position].created_at;
            updated.updated_at = Utc::now();
            endpoints[position] = updated.clone();
            updated
        };
        self.restart_schedulers(&updated).await;
        Ok(updated)
    }

    /// Delete an endpoint: timers are removed and every connection is
    /// closed with a normal (1000) close.
    pub async fn delete_endpoint(&self, id: &str) -> Result<WsEndpoint> {
        let removed = {
            let mut endpoints = self.endpoints.write().await;
            let position = endpoints
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(|| Error::not_found(format!("WebSocket endpoint not found: {}", id)))?;
            endpoints.remove(position)
        };

        if let Some(handles) = self.schedulers.write().await.remove(id) {
            for handle in handles {
                handle.abort();
            }
        }

        let mut connections = self.connections.write().await;
        let doomed: Vec<String> = connections
            .values()
            .filter(|c| c.info.endpoint_id == id)
            .map(|c| c.info.connection_id.clone())
            .collect();
        for connection_id in doomed {
            if let Some(connection) = connections.remove(&connection_id) {
                let _ = connection.sender.send(WsOutbound::Close);
            }
        }

        info!(id = %removed.id, path = %removed.path, "websocket endpoint deleted");
        Ok(removed)
    }

    /// Fetch one endpoint.
    pub async fn get_endpoint(&self, id: &str) -> Option<WsEndpoint> {
        self.endpoints.read().await.iter().find(|e| e.id == id).cloned()
    }

    /// All endpoints in registration order.
    pub async fn list_endpoints(&self) -> Vec<WsEndpoint> {
        self.endpoints.read().await.clone()
    }

    /// First active endpoint registered for `path`.
    pub async fn find_by_path(&self, path: &str) -> Option<WsEndpoint> {
        let path = normalize_path(path);
        self.endpoints
            .read()
            .await
            .iter()
            .find(|e| e.is_active() && e.path == path)
            .cloned()
    }

    /// Register a freshly upgraded connection.
    pub async fn register(
        &self,
        endpoint_id: &str,
        client_ip: Option<String>,
        user_agent: Option<String>,
        sender: mpsc::UnboundedSender<WsOutbound>,
    ) -> ConnectionInfo {
        let now = Utc::now();
        let info = ConnectionInfo {
            connection_id: uuid::Uuid::new_v4().to_string(),
            endpoint_id: endpoint_id.to_string(),
            client_ip,
            user_agent,
            connected_at: now,
            last_activity: now,
            is_alive: true,
        };
        self.connections.write().await.insert(
            info.connection_id.clone(),
            Connection {
                info: info.clone(),
                sender,
                awaiting_pong: false,
            },
        );
        self.log(endpoint_id, &info.connection_id, MessageDirection::System, "connected")
            .await;
        debug!(connection_id = %info.connection_id, endpoint_id, "websocket connection registered");
        info
    }

    /// Remove a connection after its socket closed. Broadcasts the
    /// endpoint's disconnect notice to remaining peers, if configured.
    pub async fn unregister(&self, connection_id: &str) {
        let removed = self.connections.write().await.remove(connection_id);
        let Some(connection) = removed else {
            return;
        };
        let endpoint_id = connection.info.endpoint_id;
        self.log(&endpoint_id, connection_id, MessageDirection::System, "disconnected")
            .await;

        let notice = self
            .get_endpoint(&endpoint_id)
            .await
            .and_then(|e| e.on_disconnect_message);
        if let Some(notice) = notice {
            self.broadcast_text(&endpoint_id, &notice.render()).await;
        }
    }

    /// Process one incoming text frame: log it, match patterns in order,
    /// deliver the first match's response.
    pub async fn handle_frame(&self, connection_id: &str, payload: &str) {
        let endpoint_id = {
            let mut connections = self.connections.write().await;
            let Some(connection) = connections.get_mut(connection_id) else {
                return;
            };
            connection.info.last_activity = Utc::now();
            connection.info.is_alive = true;
            connection.awaiting_pong = false;
            connection.info.endpoint_id.clone()
        };
        let Some(endpoint) = self.endpoint_snapshot(&endpoint_id).await else {
            return;
        };

        self.log(&endpoint.id, connection_id, MessageDirection::Incoming, payload)
            .await;

        let Some(pattern) = endpoint.message_patterns.iter().find(|p| p.matches(payload)) else {
            debug!(connection_id, "no websocket pattern matched");
            return;
        };

        if let Some(delay_ms) = pattern.delay_ms {
            if delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        let rendered = pattern.response.render();
        if pattern.broadcast {
            self.broadcast_text(&endpoint.id, &rendered).await;
        } else {
            let _ = self.send_text(connection_id, &rendered).await;
        }
    }

    async fn endpoint_snapshot(&self, endpoint_id: &str) -> Option<WsEndpoint> {
        self.endpoints.read().await.iter().find(|e| e.id == endpoint_id).cloned()
    }

    /// Send a text frame to one connection.
    pub async fn send_text(&self, connection_id: &str, payload: &str) -> Result<()> {
        let connections = self.connections.read().await;
        let connection = connections
            .get(connection_id)
            .ok_or_else(|| Error::not_found(format!("Connection not found: {}", connection_id)))?;
        connection
            .sender
            .send(WsOutbound::Text(payload.to_string()))
            .map_err(|_| Error::generic("Connection is closed"))?;
        let endpoint_id = connection.info.endpoint_id.clone();
        drop(connections);
        self.log(&endpoint_id, connection_id, MessageDirection::Outgoing, payload)
            .await;
        Ok(())
    }

    /// Send a text frame to every open connection on an endpoint.
    /// Returns the number of deliveries.
    pub async fn broadcast_text(&self, endpoint_id: &str, payload: &str) -> usize {
        let targets: Vec<String> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|c| c.info.endpoint_id == endpoint_id)
                .filter(|c| c.sender.send(WsOutbound::Text(payload.to_string())).is_ok())
                .map(|c| c.info.connection_id.clone())
                .collect()
        };
        for connection_id in &targets {
            self.log(endpoint_id, connection_id, MessageDirection::Outgoing, payload)
                .await;
        }
        targets.len()
    }

    /// Close one connection from the admin surface.
    pub async fn close_connection(&self, connection_id: &str) -> Result<()> {
        let mut connections = self.connections.write().await;
        let connection = connections
            .remove(connection_id)
            .ok_or_else(|| Error::not_found(format!("Connection not found: {}", connection_id)))?;
        let _ = connection.sender.send(WsOutbound::Close);
        let endpoint_id = connection.info.endpoint_id.clone();
        drop(connections);
        self.log(&endpoint_id, connection_id, MessageDirection::System, "closed by admin")
            .await;
        Ok(())
    }

    /// Record a pong from the peer.
    pub async fn mark_pong(&self, connection_id: &str) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(connection_id) {
            connection.awaiting_pong = false;
            connection.info.is_alive = true;
            connection.info.last_activity = Utc::now();
        }
    }

    /// Active-session view: open connections, optionally filtered by
    /// endpoint, that have shown activity within the last five minutes.
    pub async fn connections(&self, endpoint_id: Option<&str>) -> Vec<ConnectionInfo> {
        let cutoff = Utc::now() - ChronoDuration::minutes(ACTIVE_VIEW_IDLE_MINUTES);
        self.connections
            .read()
            .await
            .values()
            .filter(|c| endpoint_id.is_none_or(|id| c.info.endpoint_id == id))
            .filter(|c| c.info.last_activity >= cutoff)
            .map(|c| c.info.clone())
            .collect()
    }

    /// One keepalive round: terminate peers that never answered the
    /// previous ping, ping everyone else.
    pub async fn keepalive_tick(&self) {
        let mut connections = self.connections.write().await;
        let dead: Vec<String> = connections
            .values()
            .filter(|c| c.awaiting_pong)
            .map(|c| c.info.connection_id.clone())
            .collect();
        for connection_id in dead {
            if let Some(connection) = connections.remove(&connection_id) {
                warn!(connection_id = %connection_id, "terminating unresponsive websocket connection");
                let _ = connection.sender.send(WsOutbound::Close);
            }
        }
        for connection in connections.values_mut() {
            connection.awaiting_pong = true;
            connection.info.is_alive = false;
            let _ = connection.sender.send(WsOutbound::Ping);
        }
    }

    /// Spawn the 30-second keepalive loop. The task ends when the engine
    /// is dropped.
    pub fn spawn_keepalive(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(engine) = weak.upgrade() else {
                    break;
                };
                engine.keepalive_tick().await;
            }
        })
    }

    /// Replace the scheduled senders for an endpoint with fresh tasks.
    async fn restart_schedulers(&self, endpoint: &WsEndpoint) {
        let mut schedulers = self.schedulers.write().await;
        if let Some(handles) = schedulers.remove(&endpoint.id) {
            for handle in handles {
                handle.abort();
            }
        }

        let mut handles = Vec::new();
        for scheduled in endpoint.scheduled_messages.iter().filter(|s| s.enabled) {
            if scheduled.interval_ms == 0 {
                warn!(endpoint_id = %endpoint.id, "skipping scheduled message with zero interval");
                continue;
            }
            handles.push(spawn_scheduled_sender(
                Arc::downgrade(&self.connections),
                Arc::downgrade(&self.logs),
                self.max_logs,
                endpoint.id.clone(),
                scheduled.interval_ms,
                scheduled.response.clone(),
            ));
        }
        if !handles.is_empty() {
            schedulers.insert(endpoint.id.clone(), handles);
        }
    }

    /// Recent log entries, newest first.
    pub async fn logs(&self, limit: Option<usize>) -> Vec<WsLogEntry> {
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

    /// Aggregate statistics.
    pub async fn stats(&self) -> WsStats {
        let endpoints = self.endpoints.read().await;
        WsStats {
            endpoints: endpoints.len(),
            active_endpoints: endpoints.iter().filter(|e| e.is_active()).count(),
            connections: self.connections.read().await.len(),
            logs: self.logs.read().await.len(),
        }
    }

    async fn log(
        &self,
        endpoint_id: &str,
        connection_id: &str,
        direction: MessageDirection,
        payload: &str,
    ) {
        let mut logs = self.logs.write().await;
        push_log(&mut logs, self.max_logs, endpoint_id, connection_id, direction, payload);
    }
}

fn push_log(
    logs: &mut VecDeque<WsLogEntry>,
    max_logs: usize,
    endpoint_id: &str,
    connection_id: &str,
    direction: MessageDirection,
    payload: &str,
) {
    let message_type = if serde_json::from_str::<Value>(payload).is_ok() {
        "json"
    } else {
        "text"
    };
    logs.push_front(WsLogEntry {
        id: uuid::Uuid::new_v4().to_string(),
        endpoint_id: endpoint_id.to_string(),
        connection_id: connection_id.to_string(),
        direction,
        message_type: message_type.to_string(),
        payload: payload.to_string(),
        timestamp: Utc::now(),
    });
    while logs.len() > max_logs {
        logs.pop_back();
    }
}

fn spawn_scheduled_sender(
    connections: Weak<RwLock<HashMap<String, Connection>>>,
    logs: Weak<RwLock<VecDeque<WsLogEntry>>>,
    max_logs: usize,
    endpoint_id: String,
    interval_ms: u64,
    message: WsMessage,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so the cadence starts
        // one interval after registration.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(connections) = connections.upgrade() else {
                break;
            };
            let payload = message.render();
            let delivered: Vec<String> = {
                let connections = connections.read().await;
                connections
                    .values()
                    .filter(|c| c.info.endpoint_id == endpoint_id)
                    .filter(|c| c.sender.send(WsOutbound::Text(payload.clone())).is_ok())
                    .map(|c| c.info.connection_id.clone())
                    .collect()
            };
            if delivered.is_empty() {
                continue;
            }
            if let Some(logs) = logs.upgrade() {
                let mut logs = logs.write().await;
                for connection_id in &delivered {
                    push_log(
                        &mut logs,
                        max_logs,
                        &endpoint_id,
                        connection_id,
                        MessageDirection::Outgoing,
                        &payload,
                    );
                }
            }
        }
    })
}
