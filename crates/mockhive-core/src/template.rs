//! Template expansion for response bodies
//!
//! Strings are scanned for `{{$<expression>}}` occurrences. An expression
//! is a whitespace-separated token list: a generator (`uuid`,
//! `randomInt 1 10`, ...) or a request projection (`request.query.id`).
//! Unknown expressions are left verbatim, as is any expression whose
//! evaluation fails; expansion never fails a request.

use crate::request::RequestContext;
use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\$([^{}]+)\}\}").expect("template expression regex is valid")
});

const EMAIL_DOMAINS: [&str; 5] =
    ["example.com", "test.org", "mock.io", "sample.net", "demo.dev"];

const FIRST_NAMES: [&str; 8] =
    ["Alex", "Sam", "Taylor", "Jordan", "Casey", "Riley", "Morgan", "Quinn"];

const LAST_NAMES: [&str; 8] =
    ["Smith", "Lee", "Patel", "Garcia", "Kim", "Brown", "Nguyen", "Rivera"];

/// Expand templating expressions in a JSON value recursively.
/// Only string values are rewritten; everything else passes through.
pub fn expand_value(value: &Value, ctx: &RequestContext) -> Value {
    match value {
        Value::String(s) => Value::String(expand_str(s, ctx)),
        Value::Array(items) => {
            Value::Array(items.iter().map(|item| expand_value(item, ctx)).collect())
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), expand_value(v, ctx));
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Expand templating expressions in a string.
pub fn expand_str(input: &str, ctx: &RequestContext) -> String {
    if !input.contains("{{$") {
        return input.to_string();
    }
    EXPRESSION
        .replace_all(input, |caps: &regex::Captures| {
            let expression = caps.get(1).map_or("", |m| m.as_str());
            match evaluate(expression, ctx) {
                Some(replacement) => replacement,
                None => {
                    debug!(expression, "leaving unresolved template expression verbatim");
                    caps.get(0).map_or("", |m| m.as_str()).to_string()
                }
            }
        })
        .to_string()
}

fn evaluate(expression: &str, ctx: &RequestContext) -> Option<String> {
    let tokens: Vec<&str> = expression.split_whitespace().collect();
    let head = *tokens.first()?;

    // Request projections accept both `request.query key` and the dotted
    // `request.query.key` form.
    if let Some(rest) = head.strip_prefix("request.") {
        let (source, inline_key) = match rest.split_once('.') {
            Some((source, key)) => (source, Some(key)),
            None => (rest, None),
        };
        let key = inline_key.or_else(|| tokens.get(1).copied())?;
        return project_request(source, key, ctx);
    }

    match head {
        "timestamp" => Some(Utc::now().timestamp_millis().to_string()),
        "isoDate" => Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        "uuid" => Some(uuid::Uuid::new_v4().to_string()),
        "randomInt" => {
            let min: i64 = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(0);
            let max: i64 = tokens.get(2).and_then(|t| t.parse().ok()).unwrap_or(1000);
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            Some(rand::rng().random_range(lo..=hi).to_string())
        }
        "randomFloat" => {
            let min: f64 = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(0.0);
            let max: f64 = tokens.get(2).and_then(|t| t.parse().ok()).unwrap_or(1.0);
            let precision: usize = tokens.get(3).and_then(|t| t.parse().ok()).unwrap_or(2);
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            let sample = if lo == hi {
                lo
            } else {
                rand::rng().random_range(lo..hi)
            };
            Some(format!("{:.*}", precision, sample))
        }
        "randomString" => {
            let n: usize = tokens.get(1).and_then(|t| t.parse().ok()).unwrap_or(10);
            Some(random_alphanumeric(n, false))
        }
        "randomEmail" => {
            let user = random_alphanumeric(8, true);
            let domain = EMAIL_DOMAINS[rand::rng().random_range(0..EMAIL_DOMAINS.len())];
            Some(format!("{}@{}", user, domain))
        }
        "randomName" => {
            let mut rng = rand::rng();
            let first = FIRST_NAMES[rng.random_range(0..FIRST_NAMES.len())];
            let last = LAST_NAMES[rng.random_range(0..LAST_NAMES.len())];
            Some(format!("{} {}", first, last))
        }
        "randomBoolean" => Some(rand::rng().random_bool(0.5).to_string()),
        _ => None,
    }
}

fn project_request(source: &str, key: &str, ctx: &RequestContext) -> Option<String> {
    match source {
        "query" => Some(ctx.query_param(key).unwrap_or_default().to_string()),
        "header" => Some(ctx.header(key).unwrap_or_default().to_string()),
        "path" => Some(ctx.path_params.get(key).cloned().unwrap_or_default()),
        "body" => Some(
            ctx.body_path(key)
                .map(RequestContext::stringify)
                .unwrap_or_default(),
        ),
        _ => None,
    }
}

fn random_alphanumeric(n: usize, lowercase_only: bool) -> String {
    const UPPER_AND_DIGITS: &[u8] =
        b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const LOWER_AND_DIGITS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let alphabet = if lowercase_only {
        LOWER_AND_DIGITS
    } else {
        UPPER_AND_DIGITS
    };
    let mut rng = rand::rng();
    (0..n)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect()
}
