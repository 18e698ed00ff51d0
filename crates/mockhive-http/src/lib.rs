//! # MockHive HTTP
//!
//! HTTP surface for MockHive: the mock request dispatcher and the admin
//! REST facade.
//!
//! ## Overview
//!
//! - [`mock_router`] serves every method under `/mock/**`, resolving
//!   requests against the endpoint registry and composing responses
//!   through the full pipeline (auth, rate limiting, proxy, environment
//!   overlays, scenarios, conditional responses, templating, delays)
//! - [`admin_router`] exposes endpoint CRUD, logs, history, scenario and
//!   rate-limit counters, auth/environment settings and health, guarded
//!   by admin token middleware
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mockhive_core::EndpointStore;
//! use mockhive_http::{admin_router, mock_router, AdminAuth, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::new(EndpointStore::new(), AdminAuth::from_env());
//!     let app = mock_router(state.clone())
//!         .nest("/api/admin", admin_router(state));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod admin_auth;
pub mod dispatcher;
pub mod envelope;
pub mod extract;
pub mod state;

pub use admin::admin_router;
pub use admin_auth::{AdminAuth, AdminRole, AdminToken};
pub use envelope::{ApiResponse, AdminResult};
pub use state::AppState;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::routing::any;
use axum::Router;

/// Build the mock-serving router: all methods under `/mock/**`.
pub fn mock_router(state: AppState) -> Router {
    Router::new()
        .route("/mock", any(handle_mock))
        .route("/mock/", any(handle_mock))
        .route("/mock/{*path}", any(handle_mock))
        .with_state(state)
}

async fn handle_mock(State(state): State<AppState>, req: Request<Body>) -> Response {
    let path = req
        .uri()
        .path()
        .strip_prefix("/mock")
        .unwrap_or("/")
        .to_string();
    let path = if path.is_empty() { "/".to_string() } else { path };
    dispatcher::dispatch(state, req, path).await
}
