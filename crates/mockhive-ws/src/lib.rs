//! # MockHive WebSocket
//!
//! WebSocket mock engine for MockHive.
//!
//! Clients connect under the `/ws/` prefix; the path after the prefix
//! selects a registered endpoint. Incoming frames are matched against
//! the endpoint's ordered patterns (exact, contains, regex, json-path)
//! and the first match's response is delivered to the origin or
//! broadcast to the whole endpoint. Endpoints can also greet on connect,
//! notify on disconnect and broadcast on fixed intervals. A 30-second
//! ping keepalive terminates unresponsive peers.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mockhive_ws::{ws_admin_router, ws_router, WsEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let engine = Arc::new(WsEngine::new());
//! engine.spawn_keepalive(Duration::from_secs(30));
//!
//! let app = ws_router(Arc::clone(&engine))
//!     .nest("/api/admin/websocket", ws_admin_router(engine));
//! # let _ = app;
//! # }
//! ```

pub mod admin;
pub mod engine;
pub mod handler;
pub mod types;

pub use admin::ws_admin_router;
pub use engine::{ConnectionInfo, MessageDirection, WsEngine, WsLogEntry, WsStats};
pub use handler::ws_router;
pub use types::{
    MessagePattern, PatternMatchType, ScheduledMessage, WsEndpoint, WsEndpointDraft, WsMessage,
    WsMessageKind,
};
