//! Building a [`RequestContext`] from an incoming axum request

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::Request;
use mockhive_core::RequestContext;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Largest request body the dispatcher will buffer (2 MiB)
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Consume an axum request into a pipeline context. `path` must already
/// have the mock prefix stripped.
pub async fn request_context(req: Request<Body>, path: String) -> RequestContext {
    let method = req.method().as_str().to_string();
    let raw_query = req.uri().query().unwrap_or_default().to_string();

    let query: HashMap<String, String> = {
        let mut map = HashMap::new();
        for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
            // First value wins for repeated keys.
            map.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
        map
    };

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
        }
    }

    let client_ip = client_ip(&headers, req.extensions().get::<ConnectInfo<SocketAddr>>());

    let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
        .await
        .unwrap_or_else(|_| Bytes::new());
    let body = if bytes.is_empty() {
        None
    } else {
        serde_json::from_slice(&bytes).ok()
    };

    RequestContext {
        method,
        path,
        raw_query,
        query,
        headers,
        body,
        path_params: HashMap::new(),
        client_ip,
    }
}

/// Prefer the first `X-Forwarded-For` hop, fall back to the socket peer.
pub fn client_ip(
    headers: &HashMap<String, String>,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    connect_info.map(|ConnectInfo(addr)| addr.ip().to_string())
}
