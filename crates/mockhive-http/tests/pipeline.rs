//! End-to-end tests for the mock request pipeline

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mockhive_core::{
    AuthConfig, AuthMethod, Condition, ConditionOperator, ConditionSource, ConditionalResponse,
    EndpointDraft, EndpointStore, EnvironmentOverride, EnvironmentSettings, HttpMethod,
    RateLimitConfig, ResponseSpec, ScenarioConfig, ScenarioMode, ScenarioResponse,
};
use mockhive_http::{mock_router, AdminAuth, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> AppState {
    AppState::new(EndpointStore::new(), AdminAuth::open())
}

fn app(state: &AppState) -> Router {
    mock_router(state.clone())
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value, axum::http::HeaderMap) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, headers)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn path_params_feed_templates_and_logs() {
    let state = test_state();
    state
        .store
        .create(
            EndpointDraft::new(HttpMethod::GET, "/api/users/:id").with_response(ResponseSpec {
                status: 200,
                body: json!({"id": "{{$request.path.id}}"}),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

    let (status, body, _) = send(app(&state), get("/mock/api/users/42")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "42"}));

    let logs = state.logger.query(&Default::default()).await;
    assert_eq!(logs.len(), 1);
    let endpoint = &state.store.list().await[0];
    assert_eq!(logs[0].endpoint_id, endpoint.id);
    assert_eq!(logs[0].response_status, 200);
}

#[tokio::test]
async fn unmatched_requests_return_404_with_catalogue() {
    let state = test_state();
    state
        .store
        .create(EndpointDraft::new(HttpMethod::GET, "/api/users"))
        .await
        .unwrap();

    let (status, body, _) = send(app(&state), get("/mock/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
    assert_eq!(body["availableEndpoints"][0], "GET /api/users");

    let logs = state.logger.query(&Default::default()).await;
    assert_eq!(logs[0].endpoint_id, "not-found");
}

#[tokio::test]
async fn sequential_scenario_rotates_and_loops() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/flaky");
    draft.scenario = Some(ScenarioConfig {
        enabled: true,
        mode: ScenarioMode::Sequential,
        responses: vec![
            ScenarioResponse {
                order: Some(0),
                weight: None,
                status: 200,
                body: json!({"variant": "A"}),
                delay: None,
            },
            ScenarioResponse {
                order: Some(1),
                weight: None,
                status: 500,
                body: json!({"variant": "B"}),
                delay: None,
            },
        ],
        reset_after: 0,
        looped: true,
    });
    state.store.create(draft).await.unwrap();

    let mut observed = Vec::new();
    for _ in 0..3 {
        let (status, body, _) = send(app(&state), get("/mock/flaky")).await;
        observed.push((status.as_u16(), body["variant"].as_str().unwrap().to_string()));
    }
    assert_eq!(
        observed,
        vec![
            (200, "A".to_string()),
            (500, "B".to_string()),
            (200, "A".to_string())
        ]
    );
}

#[tokio::test]
async fn rate_limit_denies_third_request() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/limited");
    draft.rate_limit = Some(RateLimitConfig {
        requests_per_window: 2,
        window_seconds: 60,
        burst_limit: 0,
        key_by: Default::default(),
        key_name: None,
        error_status: None,
        error_body: None,
    });
    state.store.create(draft).await.unwrap();

    let request = |_: u32| {
        Request::builder()
            .uri("/mock/limited")
            .header("x-forwarded-for", "10.0.0.9")
            .body(Body::empty())
            .unwrap()
    };

    let (s1, _, _) = send(app(&state), request(1)).await;
    let (s2, _, _) = send(app(&state), request(2)).await;
    let (s3, _, headers) = send(app(&state), request(3)).await;

    assert_eq!(s1, StatusCode::OK);
    assert_eq!(s2, StatusCode::OK);
    assert_eq!(s3, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "0");
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "2");
    let retry_after: i64 = headers
        .get("retry-after")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after >= 0);
}

#[tokio::test]
async fn bearer_auth_guards_endpoint() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/secure");
    draft.auth = Some(AuthConfig {
        enabled: true,
        method: AuthMethod::Bearer,
        bearer: Some(mockhive_core::auth::BearerConfig {
            valid_tokens: vec!["s3cret".to_string()],
            accept_any: false,
        }),
        ..Default::default()
    });
    draft.response.body = json!({"ok": true});
    state.store.create(draft).await.unwrap();

    let (status, _, headers) = send(app(&state), get("/mock/secure")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(headers.get("www-authenticate").unwrap(), "Bearer");

    let authed = Request::builder()
        .uri("/mock/secure")
        .header("authorization", "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, body, _) = send(app(&state), authed).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));
}

#[tokio::test]
async fn global_auth_applies_when_endpoint_has_none() {
    let state = test_state();
    state
        .store
        .create(EndpointDraft::new(HttpMethod::GET, "/anything"))
        .await
        .unwrap();
    *state.auth_settings.write().await = Some(AuthConfig {
        enabled: true,
        method: AuthMethod::ApiKey,
        api_key: Some(mockhive_core::auth::ApiKeyConfig {
            header_name: None,
            query_param: None,
            valid_keys: vec!["k1".to_string()],
        }),
        exclude_paths: vec!["/open/*".to_string()],
        ..Default::default()
    });

    let (status, _, _) = send(app(&state), get("/mock/anything")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let keyed = Request::builder()
        .uri("/mock/anything")
        .header("x-api-key", "k1")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app(&state), keyed).await;
    assert_eq!(status, StatusCode::OK);

    // Excluded paths skip auth entirely.
    state
        .store
        .create(EndpointDraft::new(HttpMethod::GET, "/open/docs"))
        .await
        .unwrap();
    let (status, _, _) = send(app(&state), get("/mock/open/docs")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn conditional_responses_select_in_order() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/cond");
    draft.response.body = json!({"default": true});
    draft.conditional_responses = vec![
        ConditionalResponse {
            name: "admins".to_string(),
            conditions: vec![Condition {
                source: ConditionSource::Query,
                field: "role".to_string(),
                operator: ConditionOperator::Eq,
                value: Some("admin".to_string()),
            }],
            response: ResponseSpec {
                status: 200,
                body: json!({"admin": true}),
                ..Default::default()
            },
        },
        ConditionalResponse {
            name: "traced".to_string(),
            conditions: vec![Condition {
                source: ConditionSource::Header,
                field: "X-Trace".to_string(),
                operator: ConditionOperator::Exists,
                value: None,
            }],
            response: ResponseSpec {
                status: 418,
                body: json!({"teapot": true}),
                ..Default::default()
            },
        },
    ];
    state.store.create(draft).await.unwrap();

    let (status, body, _) = send(app(&state), get("/mock/cond?role=admin")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"admin": true}));

    let traced = Request::builder()
        .uri("/mock/cond")
        .header("X-Trace", "t1")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app(&state), traced).await;
    assert_eq!(status, StatusCode::IM_A_TEAPOT);

    let (status, body, _) = send(app(&state), get("/mock/cond")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"default": true}));
}

#[tokio::test]
async fn environment_overlay_applies_when_enabled() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/env");
    draft.response.body = json!({"env": "default"});
    draft.environments.insert(
        "staging".to_string(),
        EnvironmentOverride {
            enabled: None,
            status: Some(202),
            body: Some(json!({"env": "staging"})),
            delay: None,
        },
    );
    state.store.create(draft).await.unwrap();

    // Feature disabled: overlay ignored.
    let (status, body, _) = send(app(&state), get("/mock/env?mock_env=staging")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["env"], "default");

    state
        .environments
        .update_settings(EnvironmentSettings {
            enabled: true,
            ..Default::default()
        })
        .await;

    let (status, body, _) = send(app(&state), get("/mock/env?mock_env=staging")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["env"], "staging");

    // Header wins over query.
    let req = Request::builder()
        .uri("/mock/env?mock_env=other")
        .header("X-Mock-Environment", "staging")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(app(&state), req).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    // Unknown environment falls back to the endpoint default.
    let (status, body, _) = send(app(&state), get("/mock/env?mock_env=missing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["env"], "default");
}

#[tokio::test]
async fn scenario_wins_over_conditional() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/prec");
    draft.response.body = json!({"source": "default"});
    draft.conditional_responses = vec![ConditionalResponse {
        name: "always".to_string(),
        conditions: vec![],
        response: ResponseSpec {
            status: 418,
            body: json!({"source": "conditional"}),
            ..Default::default()
        },
    }];
    draft.scenario = Some(ScenarioConfig {
        enabled: true,
        mode: ScenarioMode::Sequential,
        responses: vec![ScenarioResponse {
            order: Some(0),
            weight: None,
            status: 201,
            body: json!({"source": "scenario"}),
            delay: None,
        }],
        reset_after: 0,
        looped: true,
    });
    state.store.create(draft).await.unwrap();

    let (status, body, _) = send(app(&state), get("/mock/prec")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["source"], "scenario");
}

#[tokio::test]
async fn exact_path_wins_over_parametric() {
    let state = test_state();
    let mut param = EndpointDraft::new(HttpMethod::GET, "/api/users/:id");
    param.response.body = json!({"kind": "param"});
    state.store.create(param).await.unwrap();

    let mut exact = EndpointDraft::new(HttpMethod::GET, "/api/users/me");
    exact.response.body = json!({"kind": "exact"});
    state.store.create(exact).await.unwrap();

    let (_, body, _) = send(app(&state), get("/mock/api/users/me")).await;
    assert_eq!(body["kind"], "exact");
    let (_, body, _) = send(app(&state), get("/mock/api/users/7")).await;
    assert_eq!(body["kind"], "param");
}

#[tokio::test]
async fn unreachable_proxy_target_maps_to_502() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/proxied");
    draft.proxy = Some(mockhive_core::ProxyConfig {
        enabled: true,
        // Nothing listens here; the forwarder must fail fast.
        target_url: "http://127.0.0.1:1/upstream".to_string(),
        timeout_seconds: Some(2),
        ..Default::default()
    });
    state.store.create(draft).await.unwrap();

    let (status, body, _) = send(app(&state), get("/mock/proxied")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Bad Gateway");
    assert_eq!(body["target"], "http://127.0.0.1:1/upstream");

    // The failure is still logged against the endpoint.
    let logs = state.logger.query(&Default::default()).await;
    assert_eq!(logs[0].response_status, 502);
}

#[tokio::test]
async fn rate_limit_headers_appear_on_allowed_responses() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/limited");
    draft.rate_limit = Some(RateLimitConfig {
        requests_per_window: 5,
        window_seconds: 60,
        burst_limit: 0,
        key_by: Default::default(),
        key_name: None,
        error_status: None,
        error_body: None,
    });
    state.store.create(draft).await.unwrap();

    let req = Request::builder()
        .uri("/mock/limited")
        .header("x-forwarded-for", "10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let (status, _, headers) = send(app(&state), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "5");
    assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "4");
    assert!(headers.get("retry-after").is_none());
}

#[tokio::test]
async fn fixed_delay_is_applied_before_response() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/slow");
    draft.response.delay = Some(mockhive_core::DelaySpec::Fixed(150));
    state.store.create(draft).await.unwrap();

    let started = std::time::Instant::now();
    let (status, _, _) = send(app(&state), get("/mock/slow")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() >= std::time::Duration::from_millis(150));

    let logs = state.logger.query(&Default::default()).await;
    assert!(logs[0].response_time_ms >= 150);
}

#[tokio::test]
async fn response_headers_from_endpoint_are_applied() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/headed");
    draft
        .response
        .headers
        .insert("X-Custom".to_string(), "yes".to_string());
    state.store.create(draft).await.unwrap();

    let (_, _, headers) = send(app(&state), get("/mock/headed")).await;
    assert_eq!(headers.get("x-custom").unwrap(), "yes");
}

#[tokio::test]
async fn template_generators_produce_fresh_values() {
    let state = test_state();
    state
        .store
        .create(
            EndpointDraft::new(HttpMethod::GET, "/gen").with_response(ResponseSpec {
                status: 200,
                body: json!({"id": "{{$uuid}}", "n": "{{$randomInt 1 6}}"}),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

    let (_, first, _) = send(app(&state), get("/mock/gen")).await;
    let (_, second, _) = send(app(&state), get("/mock/gen")).await;
    assert_ne!(first["id"], second["id"]);
    let n: i64 = first["n"].as_str().unwrap().parse().unwrap();
    assert!((1..=6).contains(&n));
}

#[tokio::test]
async fn conditional_response_headers_are_not_applied() {
    let state = test_state();
    let mut draft = EndpointDraft::new(HttpMethod::GET, "/cond-headers");
    draft
        .response
        .headers
        .insert("X-From-Endpoint".to_string(), "yes".to_string());
    draft.conditional_responses = vec![ConditionalResponse {
        name: "sneaky".to_string(),
        conditions: vec![Condition {
            source: ConditionSource::Query,
            field: "hit".to_string(),
            operator: ConditionOperator::Exists,
            value: None,
        }],
        response: ResponseSpec {
            status: 202,
            body: json!({"picked": true}),
            headers: std::collections::HashMap::from([(
                "X-From-Conditional".to_string(),
                "leak".to_string(),
            )]),
            delay: None,
        },
    }];
    state.store.create(draft).await.unwrap();

    let (status, body, headers) = send(app(&state), get("/mock/cond-headers?hit=1")).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"picked": true}));
    // A conditional response contributes status, body and delay only;
    // headers still come from the endpoint default.
    assert!(headers.get("x-from-conditional").is_none());
    assert_eq!(headers.get("x-from-endpoint").unwrap(), "yes");
}
