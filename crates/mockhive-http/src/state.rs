//! Shared server state passed to every handler
//!
//! All services are explicitly constructed at startup and cloned into
//! handlers; there is no hidden process-wide state. The core types carry
//! their own `Arc`s, so cloning the state is cheap.

use crate::admin_auth::AdminAuth;
use mockhive_core::{
    AuthConfig, EndpointStore, EnvironmentStore, ProxyForwarder, RateLimiter, RequestLogger,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Everything the HTTP surface needs, owned by one root context
#[derive(Clone)]
pub struct AppState {
    /// Endpoint registry
    pub store: EndpointStore,
    /// Mock request log
    pub logger: RequestLogger,
    /// Fixed-window rate limiter
    pub rate_limiter: RateLimiter,
    /// Upstream proxy forwarder
    pub proxy: ProxyForwarder,
    /// Global auth simulation settings
    pub auth_settings: Arc<RwLock<Option<AuthConfig>>>,
    /// Environment registry and overlay settings
    pub environments: EnvironmentStore,
    /// Admin token configuration
    pub admin_auth: Arc<AdminAuth>,
    /// Server start time, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// Assemble the state from its services.
    pub fn new(store: EndpointStore, admin_auth: AdminAuth) -> Self {
        Self {
            store,
            logger: RequestLogger::default(),
            rate_limiter: RateLimiter::new(),
            proxy: ProxyForwarder::new(),
            auth_settings: Arc::new(RwLock::new(None)),
            environments: EnvironmentStore::new(),
            admin_auth: Arc::new(admin_auth),
            started_at: Instant::now(),
        }
    }
}
