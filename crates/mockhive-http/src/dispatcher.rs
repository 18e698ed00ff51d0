//! The mock request pipeline
//!
//! Every request under the mock prefix flows through:
//! match → authenticate → rate-limit → proxy short-circuit → environment
//! → scenario → conditional → compose → template → delay → respond → log.
//! Exactly one response is produced per request; composition precedence
//! is scenario > conditional > environment overlay > endpoint default.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use mockhive_core::conditions::select_conditional;
use mockhive_core::request_log::{ENDPOINT_ERROR, ENDPOINT_NOT_FOUND};
use mockhive_core::scenario::select_response;
use mockhive_core::template::expand_value;
use mockhive_core::{
    AuthConfig, AuthMethod, DelaySpec, Endpoint, HttpMethod, RateLimitDecision, RequestContext,
    RequestLog,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::extract::request_context;
use crate::state::AppState;

/// Composed response ready to be written
struct Outcome {
    status: u16,
    body: Value,
    headers: HashMap<String, String>,
    rate: Option<RateLimitDecision>,
}

impl Outcome {
    fn new(status: u16, body: Value) -> Self {
        Self {
            status,
            body,
            headers: HashMap::new(),
            rate: None,
        }
    }
}

/// Entry point for every request under `/mock`.
pub async fn dispatch(state: AppState, req: Request<Body>, path: String) -> Response {
    let started = Instant::now();
    let ctx = request_context(req, path).await;

    let Ok(method) = ctx.method.parse::<HttpMethod>() else {
        return not_found(&state, ctx, started).await;
    };

    let Some((endpoint, params)) = state.store.find_by_path(method, &ctx.path).await else {
        return not_found(&state, ctx, started).await;
    };

    let mut ctx = ctx;
    ctx.path_params = params;

    let outcome = match run_pipeline(&state, &endpoint, &ctx).await {
        Ok(outcome) => outcome,
        Err(message) => {
            error!(endpoint_id = %endpoint.id, %message, "mock pipeline failed");
            let outcome = Outcome::new(
                500,
                json!({"error": "Internal Server Error", "message": message}),
            );
            let response = write_response(&outcome);
            log_request(&state, &ctx, ENDPOINT_ERROR, &outcome, started).await;
            return response;
        }
    };

    let response = write_response(&outcome);
    log_request(&state, &ctx, &endpoint.id, &outcome, started).await;
    response
}

async fn run_pipeline(
    state: &AppState,
    endpoint: &Endpoint,
    ctx: &RequestContext,
) -> Result<Outcome, String> {
    // Authenticate.
    if let Some(outcome) = check_auth(state, endpoint, ctx).await {
        return Ok(outcome);
    }

    // Rate-limit.
    let mut rate = None;
    if let Some(config) = &endpoint.rate_limit {
        let key = config.key_for(ctx);
        let decision = state.rate_limiter.check(&endpoint.id, config, key).await;
        if !decision.allowed {
            let status = config.error_status.unwrap_or(429);
            let body = config.error_body.clone().unwrap_or_else(|| {
                json!({
                    "error": "Too Many Requests",
                    "message": "Rate limit exceeded, retry later"
                })
            });
            let mut outcome = Outcome::new(status, body);
            outcome.rate = Some(decision);
            return Ok(outcome);
        }
        rate = Some(decision);
    }

    // Proxy short-circuit: the rest of the pipeline never runs.
    if let Some(config) = &endpoint.proxy {
        if config.enabled && !config.target_url.is_empty() {
            let outcome = match state.proxy.forward(config, ctx).await {
                Ok(upstream) => {
                    debug!(endpoint_id = %endpoint.id, status = upstream.status, from_cache = upstream.from_cache, "proxied request");
                    let mut outcome = Outcome::new(upstream.status, upstream.body);
                    outcome.headers = upstream.headers;
                    outcome
                }
                Err(e) => Outcome::new(
                    502,
                    json!({
                        "error": "Bad Gateway",
                        "message": e.to_string(),
                        "target": config.target_url,
                    }),
                ),
            };
            return Ok(outcome);
        }
    }

    // Environment overlay.
    let env_settings = state.environments.settings().await;
    let environment = env_settings.resolve(ctx);
    let overlay = if env_settings.enabled {
        endpoint
            .environments
            .get(&environment)
            .filter(|o| o.is_enabled())
    } else {
        None
    };

    // Scenario, else conditional.
    let scenario_pick = match &endpoint.scenario {
        Some(config) if config.enabled => {
            let counter = state.store.scenario_advance(&endpoint.id, config).await;
            select_response(config, counter).cloned()
        }
        _ => None,
    };
    let conditional_pick = if scenario_pick.is_none() {
        select_conditional(&endpoint.conditional_responses, ctx).cloned()
    } else {
        None
    };

    // Compose with precedence; absent fields fall through one level.
    let mut status = endpoint.response.status;
    let mut body = endpoint.response.body.clone();
    let mut delay = endpoint.response.delay.clone();
    let headers = endpoint.response.headers.clone();

    if let Some(overlay) = overlay {
        if let Some(s) = overlay.status {
            status = s;
        }
        if let Some(b) = &overlay.body {
            body = b.clone();
        }
        if let Some(d) = &overlay.delay {
            delay = Some(d.clone());
        }
    }

    // Conditional and scenario picks contribute status, body and delay
    // only; response headers always come from the endpoint default.
    if let Some(pick) = &conditional_pick {
        status = pick.response.status;
        if !pick.response.body.is_null() {
            body = pick.response.body.clone();
        }
        if let Some(d) = &pick.response.delay {
            delay = Some(d.clone());
        }
    }

    if let Some(pick) = &scenario_pick {
        status = pick.status;
        if !pick.body.is_null() {
            body = pick.body.clone();
        }
        if let Some(d) = &pick.delay {
            delay = Some(d.clone());
        }
    }

    // Template.
    let body = expand_value(&body, ctx);

    // Delay.
    apply_delay(delay.as_ref()).await;

    let mut outcome = Outcome::new(status, body);
    outcome.headers = headers;
    outcome.rate = rate;
    Ok(outcome)
}

/// Returns the failure outcome when the request is rejected; `None` when
/// authentication passes or does not apply.
async fn check_auth(
    state: &AppState,
    endpoint: &Endpoint,
    ctx: &RequestContext,
) -> Option<Outcome> {
    let global = state.auth_settings.read().await.clone();
    let effective: Option<AuthConfig> = match &endpoint.auth {
        Some(config) if config.enabled => Some(config.clone()),
        _ => global.filter(|c| c.enabled),
    };
    let config = effective?;

    if config.is_path_excluded(&ctx.path) {
        return None;
    }

    let result = config.validate(ctx);
    if result.valid {
        return None;
    }

    let status = config.error_status.unwrap_or(401);
    let body = config.error_body.clone().unwrap_or_else(|| {
        json!({
            "error": "Unauthorized",
            "message": result.error.clone().unwrap_or_else(|| "Authentication failed".to_string()),
        })
    });

    let mut outcome = Outcome::new(status, body);
    match config.method {
        AuthMethod::Bearer | AuthMethod::Jwt => {
            outcome
                .headers
                .insert("WWW-Authenticate".to_string(), "Bearer".to_string());
        }
        AuthMethod::Basic => {
            outcome.headers.insert(
                "WWW-Authenticate".to_string(),
                "Basic realm=\"mock\"".to_string(),
            );
        }
        _ => {}
    }
    Some(outcome)
}

async fn apply_delay(delay: Option<&DelaySpec>) {
    if let Some(delay) = delay {
        let ms = delay.sample();
        if ms > 0 {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }
}

fn write_response(outcome: &Outcome) -> Response {
    let mut response = (
        StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(outcome.body.clone()),
    )
        .into_response();

    let headers = response.headers_mut();
    for (name, value) in &outcome.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }

    if let Some(rate) = &outcome.rate {
        let pairs = [
            ("x-ratelimit-limit", rate.limit.to_string()),
            ("x-ratelimit-remaining", rate.remaining.to_string()),
            ("x-ratelimit-reset", rate.reset_seconds.to_string()),
        ];
        for (name, value) in pairs {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(HeaderName::from_static(name), value);
            }
        }
        if !rate.allowed {
            if let Ok(value) = HeaderValue::from_str(&rate.reset_seconds.to_string()) {
                headers.insert(HeaderName::from_static("retry-after"), value);
            }
        }
    }

    response
}

async fn not_found(state: &AppState, ctx: RequestContext, started: Instant) -> Response {
    let endpoints = state.store.list().await;
    let available: Vec<String> = endpoints
        .iter()
        .filter(|e| e.is_active())
        .map(|e| format!("{} {}", e.method, e.path))
        .collect();

    let outcome = Outcome::new(
        404,
        json!({
            "error": "Not Found",
            "message": format!("No mock endpoint matches {} {}", ctx.method, ctx.path),
            "availableEndpoints": available,
        }),
    );

    let response = (
        StatusCode::NOT_FOUND,
        Json(outcome.body.clone()),
    )
        .into_response();
    log_request(state, &ctx, ENDPOINT_NOT_FOUND, &outcome, started).await;
    response
}

async fn log_request(
    state: &AppState,
    ctx: &RequestContext,
    endpoint_id: &str,
    outcome: &Outcome,
    started: Instant,
) {
    let mut entry = RequestLog::new(endpoint_id, ctx.method.clone(), ctx.path.clone());
    entry.url = if ctx.raw_query.is_empty() {
        ctx.path.clone()
    } else {
        format!("{}?{}", ctx.path, ctx.raw_query)
    };
    entry.query_params = ctx.query.clone();
    entry.request_headers = ctx.headers.clone();
    entry.request_body = ctx.body.clone();
    entry.response_status = outcome.status;
    entry.response_data = Some(outcome.body.clone());
    entry.response_time_ms = started.elapsed().as_millis() as u64;
    entry.client_ip = ctx.client_ip.clone();
    entry.user_agent = ctx.header("user-agent").map(str::to_string);
    state.logger.append(entry).await;
}
