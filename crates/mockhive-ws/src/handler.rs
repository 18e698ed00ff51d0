//! WebSocket upgrade handling under the `/ws/` prefix
//!
//! The endpoint must exist and be active before the upgrade is accepted;
//! otherwise the client gets a plain HTTP 404. After the upgrade the
//! socket task owns the sink and drains the connection's outbound
//! channel, so engine sends never block on a slow peer.

use crate::engine::{WsEngine, WsOutbound};
use crate::types::normalize_path;
use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Socket peer address, when the server was started with connect info
struct PeerAddr(Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

/// Build the WebSocket router: upgrades under `/ws/{path}`.
pub fn ws_router(engine: Arc<WsEngine>) -> Router {
    Router::new()
        .route("/ws/{*path}", get(upgrade))
        .with_state(engine)
}

async fn upgrade(
    State(engine): State<Arc<WsEngine>>,
    Path(path): Path<String>,
    headers: HeaderMap,
    PeerAddr(peer): PeerAddr,
    ws: WebSocketUpgrade,
) -> Response {
    let path = normalize_path(&path);
    let Some(endpoint) = engine.find_by_path(&path).await else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Not Found",
                "message": format!("No WebSocket endpoint matches {}", path),
            })),
        )
            .into_response();
    };

    let client_ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| peer.map(|addr| addr.ip().to_string()));
    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ws.on_upgrade(move |socket| handle_socket(engine, endpoint.id, socket, client_ip, user_agent))
}

async fn handle_socket(
    engine: Arc<WsEngine>,
    endpoint_id: String,
    socket: WebSocket,
    client_ip: Option<String>,
    user_agent: Option<String>,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsOutbound>();

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let outcome = match frame {
                WsOutbound::Text(text) => sink.send(Message::Text(text.into())).await,
                WsOutbound::Ping => sink.send(Message::Ping(Vec::new().into())).await,
                WsOutbound::Close => {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: "".into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            };
            if outcome.is_err() {
                break;
            }
        }
    });

    let info = engine.register(&endpoint_id, client_ip, user_agent, tx).await;

    if let Some(greeting) = engine
        .get_endpoint(&endpoint_id)
        .await
        .and_then(|e| e.on_connect_message)
    {
        let _ = engine.send_text(&info.connection_id, &greeting.render()).await;
    }

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => engine.handle_frame(&info.connection_id, text.as_str()).await,
            Message::Pong(_) => engine.mark_pong(&info.connection_id).await,
            Message::Close(_) => break,
            // Pings are answered at the protocol layer.
            _ => {}
        }
    }

    debug!(connection_id = %info.connection_id, "websocket closed");
    engine.unregister(&info.connection_id).await;
    writer.abort();
}
