//! WebSocket end-to-end tests over a real socket

use futures::{SinkExt, StreamExt};
use mockhive_ws::{
    ws_router, MessagePattern, PatternMatchType, WsEndpointDraft, WsEngine, WsMessage,
    WsMessageKind,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;

async fn start_server(engine: Arc<WsEngine>) -> SocketAddr {
    let app = ws_router(engine);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

fn draft() -> WsEndpointDraft {
    WsEndpointDraft {
        path: "/chat".to_string(),
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
    }
}

async fn expect_text(
    stream: &mut (impl StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
              + Unpin),
) -> String {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), stream.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("socket error");
        match frame {
            Message::Text(text) => return text.to_string(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}

#[tokio::test]
async fn json_path_pattern_round_trip() {
    let engine = Arc::new(WsEngine::new());
    engine.create_endpoint(draft()).await.unwrap();
    let addr = start_server(Arc::clone(&engine)).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/chat", addr))
        .await
        .unwrap();

    // Greeting arrives first.
    let greeting: serde_json::Value = serde_json::from_str(&expect_text(&mut socket).await).unwrap();
    assert_eq!(greeting["type"], "welcome");

    socket
        .send(Message::Text(r#"{"type":"ping"}"#.into()))
        .await
        .unwrap();
    let reply: serde_json::Value = serde_json::from_str(&expect_text(&mut socket).await).unwrap();
    assert_eq!(reply["type"], "pong");

    // Unmatched input produces no reply; the next broadcast is what we
    // receive instead.
    socket.send(Message::Text("hello".into())).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let endpoint = &engine.list_endpoints().await[0];
    let delivered = engine.broadcast_text(&endpoint.id, "announcement").await;
    assert_eq!(delivered, 1);
    assert_eq!(expect_text(&mut socket).await, "announcement");
}

#[tokio::test]
async fn broadcast_reaches_every_client() {
    let engine = Arc::new(WsEngine::new());
    let mut d = draft();
    d.on_connect_message = None;
    engine.create_endpoint(d).await.unwrap();
    let addr = start_server(Arc::clone(&engine)).await;

    let (mut a, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/chat", addr))
        .await
        .unwrap();
    let (mut b, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws/chat", addr))
        .await
        .unwrap();

    // Wait until both registrations are visible.
    for _ in 0..50 {
        if engine.connections(None).await.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let endpoint = &engine.list_endpoints().await[0];
    assert_eq!(engine.broadcast_text(&endpoint.id, "x").await, 2);
    assert_eq!(expect_text(&mut a).await, "x");
    assert_eq!(expect_text(&mut b).await, "x");
}

#[tokio::test]
async fn unknown_path_is_rejected_before_upgrade() {
    let engine = Arc::new(WsEngine::new());
    let addr = start_server(engine).await;

    let result = tokio_tungstenite::connect_async(format!("ws://{}/ws/nope", addr)).await;
    match result {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 404);
        }
        other => panic!("expected HTTP 404 rejection, got {:?}", other.map(|_| ())),
    }
}
