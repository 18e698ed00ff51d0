//! Admin REST facade
//!
//! Every route here is mounted by the binary under `/api/admin` and
//! wrapped in the admin token middleware. Responses use the
//! `{success, data?, error?, message?}` envelope.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::admin_auth::require_admin;
use crate::state::AppState;

mod auth_settings;
mod endpoints;
mod environment;
mod health;
mod history;
mod logs;
mod proxy;
mod rate_limit;
mod scenario;
mod transfer;

/// Build the admin router.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        // Endpoint CRUD
        .route("/endpoints", get(endpoints::list).post(endpoints::create))
        .route(
            "/endpoints/{id}",
            get(endpoints::get_one)
                .put(endpoints::update)
                .delete(endpoints::remove),
        )
        // Logs
        .route("/logs", get(logs::query).delete(logs::clear))
        .route("/logs/stats", get(logs::stats))
        // History
        .route("/endpoints/{id}/history", get(history::for_endpoint))
        .route("/history", get(history::recent))
        .route("/history/{id}/restore", post(history::restore))
        // Scenario counters
        .route("/endpoints/{id}/scenario/reset", post(scenario::reset_one))
        .route("/scenario/reset-all", post(scenario::reset_all))
        .route("/scenario/counters", get(scenario::counters))
        // Auth settings
        .route(
            "/auth/settings",
            get(auth_settings::get_settings)
                .put(auth_settings::put_settings)
                .delete(auth_settings::delete_settings),
        )
        // Rate limiting
        .route("/endpoints/{id}/ratelimit/reset", post(rate_limit::reset_one))
        .route("/ratelimit/reset-all", post(rate_limit::reset_all))
        .route("/ratelimit/stats", get(rate_limit::stats))
        // Proxy cache
        .route("/proxy/cache", get(proxy::cache_stats).delete(proxy::clear_cache))
        // Environments
        .route(
            "/environment/settings",
            get(environment::get_settings)
                .put(environment::put_settings)
                .delete(environment::delete_settings),
        )
        .route("/environments", get(environment::list).post(environment::create))
        .route(
            "/environments/{name}",
            put(environment::update).delete(environment::remove),
        )
        // Registry transfer
        .route("/export", get(transfer::export))
        .route("/import", post(transfer::import))
        // Health
        .route("/health", get(health::health))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}

#[allow(unused_imports)]
pub(crate) use crate::envelope::{created, fail, from_error, ok, ok_with_message, AdminResult};
