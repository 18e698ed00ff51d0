//! Snapshot of an incoming request handed to the matching pipeline
//!
//! The dispatcher builds one `RequestContext` per request; conditions,
//! templating, auth and rate limiting all read from it and never touch
//! the transport types directly.

use serde_json::Value;
use std::collections::HashMap;

/// Immutable view of a request used by the mock pipeline
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// HTTP method, upper-case
    pub method: String,
    /// Request path after the mock prefix (starts with `/`)
    pub path: String,
    /// Raw query string without the leading `?`, empty if absent
    pub raw_query: String,
    /// Query parameters; first value wins for repeated keys
    pub query: HashMap<String, String>,
    /// Request headers, keys lower-cased
    pub headers: HashMap<String, String>,
    /// Parsed JSON body, if the payload parsed as JSON
    pub body: Option<Value>,
    /// Path parameters bound by the matcher
    pub path_params: HashMap<String, String>,
    /// Client IP, if known
    pub client_ip: Option<String>,
}

impl RequestContext {
    /// Look up a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// First value of a query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Descend a dot-separated path into the parsed body.
    pub fn body_path(&self, path: &str) -> Option<&Value> {
        let mut current = self.body.as_ref()?;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Stringify a JSON value the way condition and template lookups
    /// expect: scalars bare, composites JSON-encoded.
    pub fn stringify(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => serde_json::to_string(other).unwrap_or_default(),
        }
    }
}
