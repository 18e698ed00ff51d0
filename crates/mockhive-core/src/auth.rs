//! Authentication simulation
//!
//! Validates credentials the way a real API would present them, without
//! performing cryptographic verification. JWT handling is structural
//! only: the token must decode and its claims must satisfy the
//! configured checks, but signatures are never verified.

use crate::request::RequestContext;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Supported authentication methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthMethod {
    /// Opaque bearer token
    Bearer,
    /// Structurally-validated JWT
    Jwt,
    /// API key in a header or query parameter
    ApiKey,
    /// HTTP basic credentials
    Basic,
    /// No authentication
    #[default]
    None,
}

impl AuthMethod {
    /// Name used in outcome payloads and `WWW-Authenticate` decisions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bearer => "bearer",
            Self::Jwt => "jwt",
            Self::ApiKey => "apiKey",
            Self::Basic => "basic",
            Self::None => "none",
        }
    }
}

/// Bearer token validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BearerConfig {
    /// Accepted tokens
    #[serde(default)]
    pub valid_tokens: Vec<String>,
    /// Accept any non-empty token
    #[serde(default)]
    pub accept_any: bool,
}

/// Structural JWT validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtConfig {
    /// Reject tokens whose `exp` claim is in the past
    #[serde(default)]
    pub check_expiry: bool,
    /// Claims that must be present in the payload
    #[serde(default)]
    pub required_claims: Vec<String>,
    /// Accepted `iss` values; empty accepts any
    #[serde(default)]
    pub valid_issuers: Vec<String>,
    /// Accepted `aud` values; empty accepts any
    #[serde(default)]
    pub valid_audiences: Vec<String>,
}

/// API key validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyConfig {
    /// Header carrying the key; defaults to `X-API-Key`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    /// Query parameter fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,
    /// Accepted keys
    #[serde(default)]
    pub valid_keys: Vec<String>,
}

/// Basic auth validation settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicConfig {
    /// username → password pairs
    #[serde(default)]
    pub credentials: HashMap<String, String>,
}

/// Authentication configuration, per endpoint or global
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Whether this configuration applies
    #[serde(default)]
    pub enabled: bool,
    /// Method to validate
    #[serde(default)]
    pub method: AuthMethod,
    /// Bearer settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer: Option<BearerConfig>,
    /// JWT settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<JwtConfig>,
    /// API key settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<ApiKeyConfig>,
    /// Basic auth settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicConfig>,
    /// Glob patterns (`*` and `?`) for paths exempt from auth
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    /// Status returned on failure; defaults to 401
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_status: Option<u16>,
    /// Body returned on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_body: Option<Value>,
}

/// Result of an authentication attempt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthOutcome {
    /// Whether the request is authenticated
    pub valid: bool,
    /// Method that was validated
    pub method: String,
    /// Failure reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Decoded JWT payload when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoded: Option<Value>,
}

impl AuthOutcome {
    fn ok(method: AuthMethod) -> Self {
        Self {
            valid: true,
            method: method.as_str().to_string(),
            error: None,
            decoded: None,
        }
    }

    fn fail(method: AuthMethod, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            method: method.as_str().to_string(),
            error: Some(error.into()),
            decoded: None,
        }
    }
}

impl AuthConfig {
    /// True when `path` matches one of the exclude globs.
    /// `*` translates to `.*` and `?` to `.`; invalid results never match.
    pub fn is_path_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|glob| glob_matches(glob, path))
    }

    /// Validate the request against this configuration.
    pub fn validate(&self, ctx: &RequestContext) -> AuthOutcome {
        match self.method {
            AuthMethod::None => AuthOutcome::ok(AuthMethod::None),
            AuthMethod::Bearer => self.validate_bearer(ctx),
            AuthMethod::Jwt => self.validate_jwt(ctx),
            AuthMethod::ApiKey => self.validate_api_key(ctx),
            AuthMethod::Basic => self.validate_basic(ctx),
        }
    }

    fn validate_bearer(&self, ctx: &RequestContext) -> AuthOutcome {
        let Some(token) = bearer_token(ctx) else {
            return AuthOutcome::fail(AuthMethod::Bearer, "Missing bearer token");
        };
        let config = self.bearer.clone().unwrap_or_default();
        if config.accept_any && !token.is_empty() {
            return AuthOutcome::ok(AuthMethod::Bearer);
        }
        if config.valid_tokens.iter().any(|t| t == token) {
            AuthOutcome::ok(AuthMethod::Bearer)
        } else {
            AuthOutcome::fail(AuthMethod::Bearer, "Invalid bearer token")
        }
    }

    fn validate_jwt(&self, ctx: &RequestContext) -> AuthOutcome {
        let Some(token) = bearer_token(ctx) else {
            return AuthOutcome::fail(AuthMethod::Jwt, "Missing bearer token");
        };

        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return AuthOutcome::fail(AuthMethod::Jwt, "Token is not a three-part JWT");
        }

        let decode = |part: &str| -> Option<Value> {
            let bytes = URL_SAFE_NO_PAD.decode(part).ok()?;
            serde_json::from_slice(&bytes).ok()
        };
        let Some(header) = decode(parts[0]) else {
            return AuthOutcome::fail(AuthMethod::Jwt, "Header is not valid base64url JSON");
        };
        let Some(payload) = decode(parts[1]) else {
            return AuthOutcome::fail(AuthMethod::Jwt, "Payload is not valid base64url JSON");
        };

        let config = self.jwt.clone().unwrap_or_default();

        if config.check_expiry {
            let now = Utc::now().timestamp();
            match payload.get("exp").and_then(Value::as_i64) {
                Some(exp) if exp >= now => {}
                Some(_) => return AuthOutcome::fail(AuthMethod::Jwt, "Token is expired"),
                None => return AuthOutcome::fail(AuthMethod::Jwt, "Missing exp claim"),
            }
        }

        for claim in &config.required_claims {
            if payload.get(claim).is_none() {
                return AuthOutcome::fail(
                    AuthMethod::Jwt,
                    format!("Missing required claim: {}", claim),
                );
            }
        }

        if !config.valid_issuers.is_empty() {
            let issuer = payload.get("iss").and_then(Value::as_str).unwrap_or_default();
            if !config.valid_issuers.iter().any(|i| i == issuer) {
                return AuthOutcome::fail(AuthMethod::Jwt, "Issuer not accepted");
            }
        }

        if !config.valid_audiences.is_empty() {
            let audiences: Vec<String> = match payload.get("aud") {
                Some(Value::String(s)) => vec![s.clone()],
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
                _ => Vec::new(),
            };
            if !audiences.iter().any(|a| config.valid_audiences.contains(a)) {
                return AuthOutcome::fail(AuthMethod::Jwt, "Audience not accepted");
            }
        }

        let mut outcome = AuthOutcome::ok(AuthMethod::Jwt);
        outcome.decoded = Some(serde_json::json!({"header": header, "payload": payload}));
        outcome
    }

    fn validate_api_key(&self, ctx: &RequestContext) -> AuthOutcome {
        let config = self.api_key.clone().unwrap_or_default();
        let header_name = config.header_name.as_deref().unwrap_or("X-API-Key");

        let key = ctx.header(header_name).map(str::to_string).or_else(|| {
            config
                .query_param
                .as_deref()
                .and_then(|param| ctx.query_param(param))
                .map(str::to_string)
        });

        let Some(key) = key else {
            return AuthOutcome::fail(AuthMethod::ApiKey, "Missing API key");
        };
        if config.valid_keys.iter().any(|k| *k == key) {
            AuthOutcome::ok(AuthMethod::ApiKey)
        } else {
            AuthOutcome::fail(AuthMethod::ApiKey, "Invalid API key")
        }
    }

    fn validate_basic(&self, ctx: &RequestContext) -> AuthOutcome {
        let Some(header) = ctx.header("authorization") else {
            return AuthOutcome::fail(AuthMethod::Basic, "Missing Authorization header");
        };
        let Some(encoded) = header.strip_prefix("Basic ") else {
            return AuthOutcome::fail(AuthMethod::Basic, "Not a Basic authorization header");
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return AuthOutcome::fail(AuthMethod::Basic, "Credentials are not valid base64");
        };
        let Ok(pair) = String::from_utf8(decoded) else {
            return AuthOutcome::fail(AuthMethod::Basic, "Credentials are not valid UTF-8");
        };

        let Some((username, password)) = pair.split_once(':') else {
            return AuthOutcome::fail(AuthMethod::Basic, "Missing password");
        };
        if username.is_empty() {
            return AuthOutcome::fail(AuthMethod::Basic, "Empty username");
        }

        let config = self.basic.clone().unwrap_or_default();
        match config.credentials.get(username) {
            Some(expected) if expected == password => AuthOutcome::ok(AuthMethod::Basic),
            _ => AuthOutcome::fail(AuthMethod::Basic, "Invalid credentials"),
        }
    }
}

fn bearer_token(ctx: &RequestContext) -> Option<&str> {
    ctx.header("authorization")?.strip_prefix("Bearer ")
}

fn glob_matches(glob: &str, path: &str) -> bool {
    let translated: String = glob
        .chars()
        .map(|c| match c {
            '*' => ".*".to_string(),
            '?' => ".".to_string(),
            other => regex::escape(&other.to_string()),
        })
        .collect();
    match Regex::new(&format!("^{}$", translated)) {
        Ok(re) => re.is_match(path),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx_with_header(name: &str, value: &str) -> RequestContext {
        let mut ctx = RequestContext::default();
        ctx.headers.insert(name.to_ascii_lowercase(), value.to_string());
        ctx
    }

    fn jwt(payload: Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"alg": "none"})).unwrap());
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        format!("{}.{}.sig", header, payload)
    }

    #[test]
    fn test_bearer_valid_tokens() {
        let config = AuthConfig {
            enabled: true,
            method: AuthMethod::Bearer,
            bearer: Some(BearerConfig {
                valid_tokens: vec!["s3cret".to_string()],
                accept_any: false,
            }),
            ..Default::default()
        };

        let ok = config.validate(&ctx_with_header("authorization", "Bearer s3cret"));
        assert!(ok.valid);

        let wrong = config.validate(&ctx_with_header("authorization", "Bearer nope"));
        assert!(!wrong.valid);

        let missing = config.validate(&RequestContext::default());
        assert!(!missing.valid);
        assert_eq!(missing.method, "bearer");
    }

    #[test]
    fn test_bearer_accept_any() {
        let config = AuthConfig {
            enabled: true,
            method: AuthMethod::Bearer,
            bearer: Some(BearerConfig {
                valid_tokens: vec![],
                accept_any: true,
            }),
            ..Default::default()
        };
        assert!(config.validate(&ctx_with_header("authorization", "Bearer anything")).valid);
        assert!(!config.validate(&ctx_with_header("authorization", "Bearer ")).valid);
    }

    #[test]
    fn test_jwt_structure_and_expiry() {
        let config = AuthConfig {
            enabled: true,
            method: AuthMethod::Jwt,
            jwt: Some(JwtConfig {
                check_expiry: true,
                ..Default::default()
            }),
            ..Default::default()
        };

        let future = Utc::now().timestamp() + 3600;
        let token = jwt(json!({"sub": "u1", "exp": future}));
        assert!(config.validate(&ctx_with_header("authorization", &format!("Bearer {}", token))).valid);

        let expired = jwt(json!({"sub": "u1", "exp": 1}));
        let outcome =
            config.validate(&ctx_with_header("authorization", &format!("Bearer {}", expired)));
        assert!(!outcome.valid);
        assert_eq!(outcome.error.as_deref(), Some("Token is expired"));

        let malformed = config.validate(&ctx_with_header("authorization", "Bearer only.two"));
        assert!(!malformed.valid);
    }

    #[test]
    fn test_jwt_claims_issuer_audience() {
        let config = AuthConfig {
            enabled: true,
            method: AuthMethod::Jwt,
            jwt: Some(JwtConfig {
                check_expiry: false,
                required_claims: vec!["sub".to_string()],
                valid_issuers: vec!["hive".to_string()],
                valid_audiences: vec!["api".to_string()],
            }),
            ..Default::default()
        };

        let good = jwt(json!({"sub": "u1", "iss": "hive", "aud": ["web", "api"]}));
        let outcome = config.validate(&ctx_with_header("authorization", &format!("Bearer {}", good)));
        assert!(outcome.valid, "{:?}", outcome.error);
        assert!(outcome.decoded.is_some());

        let bad_iss = jwt(json!({"sub": "u1", "iss": "other", "aud": "api"}));
        assert!(!config
            .validate(&ctx_with_header("authorization", &format!("Bearer {}", bad_iss)))
            .valid);

        let no_sub = jwt(json!({"iss": "hive", "aud": "api"}));
        assert!(!config
            .validate(&ctx_with_header("authorization", &format!("Bearer {}", no_sub)))
            .valid);
    }

    #[test]
    fn test_api_key_header_and_query() {
        let config = AuthConfig {
            enabled: true,
            method: AuthMethod::ApiKey,
            api_key: Some(ApiKeyConfig {
                header_name: None,
                query_param: Some("api_key".to_string()),
                valid_keys: vec!["k-123".to_string()],
            }),
            ..Default::default()
        };

        assert!(config.validate(&ctx_with_header("x-api-key", "k-123")).valid);

        let mut via_query = RequestContext::default();
        via_query.query.insert("api_key".to_string(), "k-123".to_string());
        assert!(config.validate(&via_query).valid);

        assert!(!config.validate(&ctx_with_header("x-api-key", "wrong")).valid);
    }

    #[test]
    fn test_basic_credentials() {
        let mut credentials = HashMap::new();
        credentials.insert("ada".to_string(), "pw".to_string());
        let config = AuthConfig {
            enabled: true,
            method: AuthMethod::Basic,
            basic: Some(BasicConfig { credentials }),
            ..Default::default()
        };

        let encoded = STANDARD.encode("ada:pw");
        assert!(config.validate(&ctx_with_header("authorization", &format!("Basic {}", encoded))).valid);

        let no_password = STANDARD.encode("ada");
        assert!(!config
            .validate(&ctx_with_header("authorization", &format!("Basic {}", no_password)))
            .valid);

        let empty_user = STANDARD.encode(":pw");
        assert!(!config
            .validate(&ctx_with_header("authorization", &format!("Basic {}", empty_user)))
            .valid);
    }

    #[test]
    fn test_exclude_path_globs() {
        let config = AuthConfig {
            exclude_paths: vec!["/public/*".to_string(), "/ping?".to_string()],
            ..Default::default()
        };
        assert!(config.is_path_excluded("/public/docs"));
        assert!(config.is_path_excluded("/ping1"));
        assert!(!config.is_path_excluded("/private/docs"));
        assert!(!config.is_path_excluded("/ping12"));
    }
}
