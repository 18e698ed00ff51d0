//! Conditional response selection
//!
//! A `ConditionalResponse` carries an ordered list of conditions over the
//! request (query, header or body) that combine with AND. The first
//! conditional response whose conditions all match wins.

use crate::endpoint::ResponseSpec;
use crate::request::RequestContext;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where a condition reads its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionSource {
    /// First value of a query parameter
    Query,
    /// Request header, case-insensitive
    Header,
    /// Dot-path into the parsed JSON body
    Body,
}

/// Comparison operator applied to the extracted value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    /// Exact string equality
    Eq,
    /// Exact string inequality
    Neq,
    /// Substring containment
    Contains,
    /// Prefix match
    StartsWith,
    /// Suffix match
    EndsWith,
    /// Regex test; an invalid pattern never matches
    Regex,
    /// Value is present and non-empty
    Exists,
}

/// A single predicate over the request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Value source
    pub source: ConditionSource,
    /// Field name, or dot-path for body sources
    pub field: String,
    /// Comparison operator
    pub operator: ConditionOperator,
    /// Expected value; unused for `exists`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A named response guarded by an AND-conjunction of conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalResponse {
    /// Display name
    pub name: String,
    /// Conditions; all must match
    pub conditions: Vec<Condition>,
    /// Response returned when the conditions match
    pub response: ResponseSpec,
}

impl Condition {
    /// Extract the value this condition reads from the request.
    fn extract(&self, ctx: &RequestContext) -> Option<String> {
        match self.source {
            ConditionSource::Query => ctx.query_param(&self.field).map(str::to_string),
            ConditionSource::Header => ctx.header(&self.field).map(str::to_string),
            ConditionSource::Body => ctx.body_path(&self.field).map(RequestContext::stringify),
        }
    }

    /// Evaluate the condition against a request.
    pub fn matches(&self, ctx: &RequestContext) -> bool {
        let actual = self.extract(ctx);

        if self.operator == ConditionOperator::Exists {
            return actual.is_some_and(|v| !v.is_empty());
        }

        let Some(actual) = actual else {
            return false;
        };
        let expected = self.value.as_deref().unwrap_or("");

        match self.operator {
            ConditionOperator::Eq => actual == expected,
            ConditionOperator::Neq => actual != expected,
            ConditionOperator::Contains => actual.contains(expected),
            ConditionOperator::StartsWith => actual.starts_with(expected),
            ConditionOperator::EndsWith => actual.ends_with(expected),
            ConditionOperator::Regex => match Regex::new(expected) {
                Ok(re) => re.is_match(&actual),
                Err(_) => false,
            },
            ConditionOperator::Exists => !actual.is_empty(),
        }
    }
}

/// Pick the first conditional response whose conditions all match.
pub fn select_conditional<'a>(
    responses: &'a [ConditionalResponse],
    ctx: &RequestContext,
) -> Option<&'a ConditionalResponse> {
    responses.iter().find(|cr| cr.conditions.iter().all(|c| c.matches(ctx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn request() -> RequestContext {
        let mut query = HashMap::new();
        query.insert("role".to_string(), "admin".to_string());
        let mut headers = HashMap::new();
        headers.insert("x-trace".to_string(), "trace-1".to_string());
        RequestContext {
            method: "GET".to_string(),
            path: "/api/users".to_string(),
            query,
            headers,
            body: Some(json!({"user": {"name": "ada", "age": 37}})),
            ..Default::default()
        }
    }

    fn cond(
        source: ConditionSource,
        field: &str,
        operator: ConditionOperator,
        value: Option<&str>,
    ) -> Condition {
        Condition {
            source,
            field: field.to_string(),
            operator,
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn test_query_eq() {
        let ctx = request();
        assert!(cond(ConditionSource::Query, "role", ConditionOperator::Eq, Some("admin"))
            .matches(&ctx));
        assert!(!cond(ConditionSource::Query, "role", ConditionOperator::Eq, Some("user"))
            .matches(&ctx));
        assert!(!cond(ConditionSource::Query, "missing", ConditionOperator::Eq, Some("x"))
            .matches(&ctx));
    }

    #[test]
    fn test_header_exists_case_insensitive() {
        let ctx = request();
        assert!(cond(ConditionSource::Header, "X-Trace", ConditionOperator::Exists, None)
            .matches(&ctx));
        assert!(!cond(ConditionSource::Header, "X-Other", ConditionOperator::Exists, None)
            .matches(&ctx));
    }

    #[test]
    fn test_body_dot_path() {
        let ctx = request();
        assert!(cond(ConditionSource::Body, "user.name", ConditionOperator::Eq, Some("ada"))
            .matches(&ctx));
        assert!(cond(ConditionSource::Body, "user.age", ConditionOperator::Eq, Some("37"))
            .matches(&ctx));
        assert!(cond(ConditionSource::Body, "user.name", ConditionOperator::StartsWith, Some("a"))
            .matches(&ctx));
    }

    #[test]
    fn test_invalid_regex_is_false_not_error() {
        let ctx = request();
        assert!(!cond(ConditionSource::Query, "role", ConditionOperator::Regex, Some("[invalid"))
            .matches(&ctx));
        assert!(cond(ConditionSource::Query, "role", ConditionOperator::Regex, Some("^adm"))
            .matches(&ctx));
    }

    #[test]
    fn test_first_fully_matching_response_wins() {
        let ctx = request();
        let responses = vec![
            ConditionalResponse {
                name: "needs header and query".to_string(),
                conditions: vec![
                    cond(ConditionSource::Query, "role", ConditionOperator::Eq, Some("admin")),
                    cond(ConditionSource::Header, "x-missing", ConditionOperator::Exists, None),
                ],
                response: ResponseSpec {
                    status: 403,
                    ..Default::default()
                },
            },
            ConditionalResponse {
                name: "admin".to_string(),
                conditions: vec![cond(
                    ConditionSource::Query,
                    "role",
                    ConditionOperator::Eq,
                    Some("admin"),
                )],
                response: ResponseSpec {
                    status: 200,
                    body: json!({"admin": true}),
                    ..Default::default()
                },
            },
        ];

        let selected = select_conditional(&responses, &ctx).unwrap();
        assert_eq!(selected.name, "admin");
        assert_eq!(selected.response.status, 200);
    }
}
