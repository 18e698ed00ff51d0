//! Sample data seeding for development servers
//!
//! Runs only outside production and only when the registry is empty, so
//! a persisted workspace is never polluted.

use mockhive_core::{
    Condition, ConditionOperator, ConditionSource, ConditionalResponse, EndpointDraft, HttpMethod,
    ResponseSpec, ScenarioConfig, ScenarioMode, ScenarioResponse,
};
use mockhive_graphql::{GraphQLEndpointDraft, GraphQLRegistry, GraphQLResolverDraft, OperationType};
use mockhive_http::AppState;
use mockhive_ws::{
    MessagePattern, PatternMatchType, WsEndpointDraft, WsEngine, WsMessage, WsMessageKind,
};
use serde_json::json;
use tracing::{info, warn};

/// Seed a handful of demonstration endpoints.
pub async fn seed_sample_data(state: &AppState, ws: &WsEngine, graphql: &GraphQLRegistry) {
    if !state.store.list().await.is_empty() {
        return;
    }

    let drafts = vec![
        EndpointDraft::new(HttpMethod::GET, "/api/users").with_response(ResponseSpec {
            status: 200,
            body: json!([
                {"id": "{{$uuid}}", "name": "{{$randomName}}", "email": "{{$randomEmail}}"},
                {"id": "{{$uuid}}", "name": "{{$randomName}}", "email": "{{$randomEmail}}"}
            ]),
            ..Default::default()
        }),
        EndpointDraft::new(HttpMethod::GET, "/api/users/:id").with_response(ResponseSpec {
            status: 200,
            body: json!({
                "id": "{{$request.path.id}}",
                "name": "{{$randomName}}",
                "fetchedAt": "{{$isoDate}}"
            }),
            ..Default::default()
        }),
        {
            let mut draft = EndpointDraft::new(HttpMethod::GET, "/api/orders");
            draft.response = ResponseSpec {
                status: 200,
                body: json!({"orders": []}),
                ..Default::default()
            };
            draft.conditional_responses = vec![ConditionalResponse {
                name: "admin view".to_string(),
                conditions: vec![Condition {
                    source: ConditionSource::Query,
                    field: "role".to_string(),
                    operator: ConditionOperator::Eq,
                    value: Some("admin".to_string()),
                }],
                response: ResponseSpec {
                    status: 200,
                    body: json!({"orders": [], "internal": true}),
                    ..Default::default()
                },
            }];
            draft
        },
        {
            let mut draft = EndpointDraft::new(HttpMethod::GET, "/api/flaky");
            draft.scenario = Some(ScenarioConfig {
                enabled: true,
                mode: ScenarioMode::Sequential,
                responses: vec![
                    ScenarioResponse {
                        order: Some(0),
                        weight: None,
                        status: 200,
                        body: json!({"ok": true}),
                        delay: None,
                    },
                    ScenarioResponse {
                        order: Some(1),
                        weight: None,
                        status: 503,
                        body: json!({"error": "Service Unavailable"}),
                        delay: None,
                    },
                ],
                reset_after: 300,
                looped: true,
            });
            draft
        },
    ];

    let mut seeded = 0;
    for draft in drafts {
        match state.store.create(draft).await {
            Ok(_) => seeded += 1,
            Err(e) => warn!(error = %e, "failed to seed endpoint"),
        }
    }

    let ws_draft = WsEndpointDraft {
        path: "/echo".to_string(),
        status: Default::default(),
        message_patterns: vec![MessagePattern {
            name: "ping".to_string(),
            match_type: PatternMatchType::JsonPath,
            pattern: "type=ping".to_string(),
            response: WsMessage {
                kind: WsMessageKind::Json,
                data: json!({"type": "pong"}),
            },
            broadcast: false,
            delay_ms: None,
        }],
        on_connect_message: Some(WsMessage {
            kind: WsMessageKind::Json,
            data: json!({"type": "welcome"}),
        }),
        on_disconnect_message: None,
        scheduled_messages: vec![],
    };
    if let Err(e) = ws.create_endpoint(ws_draft).await {
        warn!(error = %e, "failed to seed websocket endpoint");
    }

    let graphql_draft = GraphQLEndpointDraft {
        path: "/graphql".to_string(),
        status: Default::default(),
        resolvers: vec![GraphQLResolverDraft {
            operation_name: Some("GetUsers".to_string()),
            operation_type: Some(OperationType::Query),
            variables_match: None,
            response_data: json!({"users": [{"id": "1", "name": "Sample User"}]}),
            errors: None,
            delay_ms: None,
            enabled: true,
        }],
        default_response: None,
    };
    if let Err(e) = graphql.create_endpoint(graphql_draft).await {
        warn!(error = %e, "failed to seed graphql endpoint");
    }

    info!(seeded, "sample endpoints registered");
}
