//! WebSocket endpoint model: patterns, scheduled messages and payloads

use chrono::{DateTime, Utc};
use mockhive_core::EndpointStatus;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How an incoming frame is matched against a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternMatchType {
    /// Whole-payload string equality
    Exact,
    /// Substring containment
    Contains,
    /// Regex test; an invalid pattern never matches
    Regex,
    /// `dotted.path=expected` comparison against the parsed JSON payload
    JsonPath,
}

/// Payload kind of an outgoing message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WsMessageKind {
    /// `data` is serialised as JSON
    #[default]
    Json,
    /// `data` is sent as plain text
    Text,
}

/// An outgoing message definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsMessage {
    /// Payload kind
    #[serde(rename = "type", default)]
    pub kind: WsMessageKind,
    /// Payload content
    #[serde(default)]
    pub data: Value,
}

impl WsMessage {
    /// Render the wire representation.
    pub fn render(&self) -> String {
        match self.kind {
            WsMessageKind::Json => self.data.to_string(),
            WsMessageKind::Text => match &self.data {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            },
        }
    }
}

/// One input pattern paired with its response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePattern {
    /// Display name
    pub name: String,
    /// Match rule
    pub match_type: PatternMatchType,
    /// Pattern text, interpreted per `match_type`
    pub pattern: String,
    /// Response sent on match
    pub response: WsMessage,
    /// Deliver to every open connection on the endpoint instead of only
    /// the origin
    #[serde(default)]
    pub broadcast: bool,
    /// Delay before delivery, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl MessagePattern {
    /// Whether `payload` matches this pattern.
    pub fn matches(&self, payload: &str) -> bool {
        match self.match_type {
            PatternMatchType::Exact => payload == self.pattern,
            PatternMatchType::Contains => payload.contains(&self.pattern),
            PatternMatchType::Regex => match Regex::new(&self.pattern) {
                Ok(re) => re.is_match(payload),
                Err(_) => false,
            },
            PatternMatchType::JsonPath => {
                let Some((path, expected)) = self.pattern.split_once('=') else {
                    return false;
                };
                let Ok(parsed) = serde_json::from_str::<Value>(payload) else {
                    return false;
                };
                let mut current = &parsed;
                for segment in path.split('.') {
                    current = match current {
                        Value::Object(map) => match map.get(segment) {
                            Some(v) => v,
                            None => return false,
                        },
                        _ => return false,
                    };
                }
                let actual = match current {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                actual == expected
            }
        }
    }
}

/// A message broadcast on a fixed interval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMessage {
    /// Firing interval in milliseconds
    pub interval_ms: u64,
    /// Whether this schedule runs
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Message delivered on each tick
    pub response: WsMessage,
}

fn default_true() -> bool {
    true
}

/// A registered WebSocket mock endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEndpoint {
    /// Opaque unique identifier
    pub id: String,
    /// Endpoint path under the `/ws` prefix, normalised to start with `/`
    pub path: String,
    /// Active/inactive status
    #[serde(default)]
    pub status: EndpointStatus,
    /// Ordered input patterns
    #[serde(default)]
    pub message_patterns: Vec<MessagePattern>,
    /// Message sent to a client right after it connects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_connect_message: Option<WsMessage>,
    /// Message broadcast to remaining clients when one disconnects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_disconnect_message: Option<WsMessage>,
    /// Interval broadcasts
    #[serde(default)]
    pub scheduled_messages: Vec<ScheduledMessage>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl WsEndpoint {
    /// True when the endpoint accepts connections.
    pub fn is_active(&self) -> bool {
        self.status == EndpointStatus::Active
    }
}

/// Fields supplied by an admin create or update request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsEndpointDraft {
    /// Endpoint path; a missing leading `/` is added
    pub path: String,
    /// Active/inactive status
    #[serde(default)]
    pub status: EndpointStatus,
    /// Ordered input patterns
    #[serde(default)]
    pub message_patterns: Vec<MessagePattern>,
    /// Connect greeting
    #[serde(default)]
    pub on_connect_message: Option<WsMessage>,
    /// Disconnect notice
    #[serde(default)]
    pub on_disconnect_message: Option<WsMessage>,
    /// Interval broadcasts
    #[serde(default)]
    pub scheduled_messages: Vec<ScheduledMessage>,
}

/// Normalise an endpoint path to begin with exactly one `/`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_start_matches('/');
    format!("/{}", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pattern(match_type: PatternMatchType, pattern: &str) -> MessagePattern {
        MessagePattern {
            name: "p".to_string(),
            match_type,
            pattern: pattern.to_string(),
            response: WsMessage {
                kind: WsMessageKind::Json,
                data: json!({"ok": true}),
            },
            broadcast: false,
            delay_ms: None,
        }
    }

    #[test]
    fn test_exact_and_contains() {
        assert!(pattern(PatternMatchType::Exact, "hello").matches("hello"));
        assert!(!pattern(PatternMatchType::Exact, "hello").matches("hello!"));
        assert!(pattern(PatternMatchType::Contains, "ell").matches("hello"));
        assert!(!pattern(PatternMatchType::Contains, "xyz").matches("hello"));
    }

    #[test]
    fn test_regex_invalid_never_matches() {
        assert!(pattern(PatternMatchType::Regex, "^h.*o$").matches("hello"));
        assert!(!pattern(PatternMatchType::Regex, "[oops").matches("anything"));
    }

    #[test]
    fn test_json_path() {
        let p = pattern(PatternMatchType::JsonPath, "type=ping");
        assert!(p.matches(r#"{"type":"ping"}"#));
        assert!(!p.matches(r#"{"type":"pong"}"#));
        assert!(!p.matches("not json"));

        let nested = pattern(PatternMatchType::JsonPath, "meta.seq=3");
        assert!(nested.matches(r#"{"meta":{"seq":3}}"#));
        assert!(!nested.matches(r#"{"meta":{"seq":4}}"#));
    }

    #[test]
    fn test_match_type_wire_names() {
        let parsed: PatternMatchType = serde_json::from_value(json!("json-path")).unwrap();
        assert_eq!(parsed, PatternMatchType::JsonPath);
        let parsed: PatternMatchType = serde_json::from_value(json!("exact")).unwrap();
        assert_eq!(parsed, PatternMatchType::Exact);
    }

    #[test]
    fn test_render() {
        let json_msg = WsMessage {
            kind: WsMessageKind::Json,
            data: json!({"type": "pong"}),
        };
        assert_eq!(json_msg.render(), r#"{"type":"pong"}"#);

        let text_msg = WsMessage {
            kind: WsMessageKind::Text,
            data: json!("plain"),
        };
        assert_eq!(text_msg.render(), "plain");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("chat"), "/chat");
        assert_eq!(normalize_path("/chat"), "/chat");
        assert_eq!(normalize_path("//chat"), "/chat");
    }
}
