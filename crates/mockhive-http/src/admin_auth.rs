//! Admin surface token authentication
//!
//! Tokens come from `ADMIN_TOKENS` (comma-separated `name:token:role`
//! triples) or, when that is empty, a single `ADMIN_TOKEN` with the
//! admin role. Enforcement is gated on `TEAM_ENABLED` and
//! `TEAM_REQUIRE_AUTH`; when either is off the admin surface is open.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::warn;

use crate::envelope::fail;
use crate::state::AppState;

/// Default token used when no admin token is configured
pub const DEFAULT_ADMIN_TOKEN: &str = "dev-admin-token";

/// Capability tier of an admin token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    /// Full access
    Admin,
    /// Read/write, except auth settings
    Editor,
    /// Read-only
    Viewer,
}

impl AdminRole {
    /// Lower-case role name as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Viewer => "viewer",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "editor" => Some(Self::Editor),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }
}

/// One named admin token
#[derive(Debug, Clone)]
pub struct AdminToken {
    /// Display name
    pub name: String,
    /// Secret value
    pub token: String,
    /// Capability tier
    pub role: AdminRole,
}

/// Admin auth configuration
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Team features on
    pub enabled: bool,
    /// Whether admin calls must present a token
    pub require_auth: bool,
    /// Accepted tokens
    pub tokens: Vec<AdminToken>,
}

impl AdminAuth {
    /// Open configuration: no enforcement.
    pub fn open() -> Self {
        Self {
            enabled: false,
            require_auth: false,
            tokens: Vec::new(),
        }
    }

    /// Build from the process environment.
    pub fn from_env() -> Self {
        let enabled = env_flag("TEAM_ENABLED");
        let require_auth = env_flag("TEAM_REQUIRE_AUTH");
        let tokens = parse_tokens(
            &std::env::var("ADMIN_TOKENS").unwrap_or_default(),
            &std::env::var("ADMIN_TOKEN").unwrap_or_else(|_| DEFAULT_ADMIN_TOKEN.to_string()),
        );
        Self {
            enabled,
            require_auth,
            tokens,
        }
    }

    /// Whether requests must carry a token.
    pub fn enforcing(&self) -> bool {
        self.enabled && self.require_auth
    }

    /// Look up a presented token.
    pub fn resolve(&self, token: &str) -> Option<&AdminToken> {
        self.tokens.iter().find(|t| t.token == token)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Parse `name:token:role` triples; malformed entries are dropped with a
/// warning. An empty list falls back to a single admin token.
pub fn parse_tokens(triples: &str, fallback_token: &str) -> Vec<AdminToken> {
    let mut tokens = Vec::new();
    for entry in triples.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let parts: Vec<&str> = entry.split(':').collect();
        let parsed = match parts.as_slice() {
            [name, token, role] if !name.is_empty() && !token.is_empty() => {
                AdminRole::parse(role).map(|role| AdminToken {
                    name: (*name).to_string(),
                    token: (*token).to_string(),
                    role,
                })
            }
            _ => None,
        };
        match parsed {
            Some(token) => tokens.push(token),
            None => warn!(entry, "ignoring malformed ADMIN_TOKENS entry"),
        }
    }

    if tokens.is_empty() {
        tokens.push(AdminToken {
            name: "default".to_string(),
            token: fallback_token.to_string(),
            role: AdminRole::Admin,
        });
    }
    tokens
}

/// Whether `role` may perform `method` on `path` (path relative to the
/// admin mount).
pub fn role_permits(role: AdminRole, method: &Method, path: &str) -> bool {
    match role {
        AdminRole::Admin => true,
        AdminRole::Editor => !(path.starts_with("/auth/settings") && *method != Method::GET),
        AdminRole::Viewer => *method == Method::GET,
    }
}

/// Axum middleware guarding the admin router.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let auth = &state.admin_auth;
    if !auth.enforcing() || req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let presented = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = presented.and_then(|t| auth.resolve(t)) else {
        return fail(StatusCode::UNAUTHORIZED, "Missing or invalid admin token").into_response();
    };

    if !role_permits(token.role, req.method(), req.uri().path()) {
        return fail(
            StatusCode::FORBIDDEN,
            format!("Role '{}' may not perform this operation", token.role.as_str()),
        )
        .into_response();
    }

    next.run(req).await
}
