//! Environment overlays: per-environment response overrides selected by
//! header or query parameter

use crate::endpoint::DelaySpec;
use crate::request::RequestContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Header consulted for the environment name when none is configured
pub const DEFAULT_ENV_HEADER: &str = "X-Mock-Environment";
/// Query parameter consulted when the header is absent
pub const DEFAULT_ENV_QUERY: &str = "mock_env";
/// Name of the built-in environment
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// Replacement response fields for one environment on one endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentOverride {
    /// `Some(false)` disables the override without removing it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Replacement status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Replacement body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Replacement delay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelaySpec>,
}

impl EnvironmentOverride {
    /// Overrides apply unless explicitly disabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled != Some(false)
    }
}

/// Global environment feature settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSettings {
    /// Whether overlays are applied at all
    #[serde(default)]
    pub enabled: bool,
    /// Environment assumed when the request names none
    #[serde(default = "default_environment_name")]
    pub default_environment: String,
    /// Header carrying the environment name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,
    /// Query parameter fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,
}

fn default_environment_name() -> String {
    DEFAULT_ENVIRONMENT.to_string()
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            default_environment: default_environment_name(),
            header_name: None,
            query_param: None,
        }
    }
}

impl EnvironmentSettings {
    /// Resolve the environment name for a request: header, then query,
    /// then the configured default.
    pub fn resolve(&self, ctx: &RequestContext) -> String {
        let header_name = self.header_name.as_deref().unwrap_or(DEFAULT_ENV_HEADER);
        if let Some(name) = ctx.header(header_name) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        let query_param = self.query_param.as_deref().unwrap_or(DEFAULT_ENV_QUERY);
        if let Some(name) = ctx.query_param(query_param) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        self.default_environment.clone()
    }
}

/// A named environment registered with the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDef {
    /// Environment name, unique
    pub name: String,
    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Registry of environments plus the overlay settings
#[derive(Debug, Clone)]
pub struct EnvironmentStore {
    settings: Arc<RwLock<EnvironmentSettings>>,
    environments: Arc<RwLock<Vec<EnvironmentDef>>>,
}

impl Default for EnvironmentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentStore {
    /// Create a store holding only the default environment.
    pub fn new() -> Self {
        Self {
            settings: Arc::new(RwLock::new(EnvironmentSettings::default())),
            environments: Arc::new(RwLock::new(vec![EnvironmentDef {
                name: DEFAULT_ENVIRONMENT.to_string(),
                description: Some("Built-in default environment".to_string()),
                created_at: Utc::now(),
            }])),
        }
    }

    /// Current settings snapshot.
    pub async fn settings(&self) -> EnvironmentSettings {
        self.settings.read().await.clone()
    }

    /// Replace the settings.
    pub async fn update_settings(&self, settings: EnvironmentSettings) {
        *self.settings.write().await = settings;
    }

    /// Reset settings to defaults (overlays disabled).
    pub async fn clear_settings(&self) {
        *self.settings.write().await = EnvironmentSettings::default();
    }

    /// List registered environments.
    pub async fn list(&self) -> Vec<EnvironmentDef> {
        self.environments.read().await.clone()
    }

    /// Register a new environment.
    pub async fn create(&self, name: &str, description: Option<String>) -> crate::Result<EnvironmentDef> {
        if name.trim().is_empty() {
            return Err(crate::Error::validation("Environment name must not be empty"));
        }
        let mut environments = self.environments.write().await;
        if environments.iter().any(|e| e.name == name) {
            return Err(crate::Error::validation(format!("Environment already exists: {}", name)));
        }
        let def = EnvironmentDef {
            name: name.to_string(),
            description,
            created_at: Utc::now(),
        };
        environments.push(def.clone());
        Ok(def)
    }

    /// Update an environment's description.
    pub async fn update(&self, name: &str, description: Option<String>) -> crate::Result<EnvironmentDef> {
        let mut environments = self.environments.write().await;
        let def = environments
            .iter_mut()
            .find(|e| e.name == name)
            .ok_or_else(|| crate::Error::not_found(format!("Environment not found: {}", name)))?;
        def.description = description;
        Ok(def.clone())
    }

    /// Remove an environment. The default environment cannot be deleted.
    pub async fn delete(&self, name: &str) -> crate::Result<()> {
        if name == DEFAULT_ENVIRONMENT {
            return Err(crate::Error::validation(
                "The default environment cannot be deleted",
            ));
        }
        let mut environments = self.environments.write().await;
        let before = environments.len();
        environments.retain(|e| e.name != name);
        if environments.len() == before {
            return Err(crate::Error::not_found(format!("Environment not found: {}", name)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_prefers_header_then_query() {
        let settings = EnvironmentSettings {
            enabled: true,
            ..Default::default()
        };

        let mut ctx = RequestContext::default();
        assert_eq!(settings.resolve(&ctx), "default");

        ctx.query.insert("mock_env".to_string(), "staging".to_string());
        assert_eq!(settings.resolve(&ctx), "staging");

        ctx.headers
            .insert("x-mock-environment".to_string(), "prod".to_string());
        assert_eq!(settings.resolve(&ctx), "prod");
    }

    #[test]
    fn test_configured_names_win() {
        let settings = EnvironmentSettings {
            enabled: true,
            default_environment: "base".to_string(),
            header_name: Some("X-Env".to_string()),
            query_param: Some("env".to_string()),
        };

        let mut ctx = RequestContext::default();
        assert_eq!(settings.resolve(&ctx), "base");
        ctx.query.insert("env".to_string(), "qa".to_string());
        assert_eq!(settings.resolve(&ctx), "qa");
        ctx.headers.insert("x-env".to_string(), "dev".to_string());
        assert_eq!(settings.resolve(&ctx), "dev");
    }

    #[test]
    fn test_override_enabled_flag() {
        let default_override = EnvironmentOverride::default();
        assert!(default_override.is_enabled());
        let disabled = EnvironmentOverride {
            enabled: Some(false),
            ..Default::default()
        };
        assert!(!disabled.is_enabled());
    }

    #[tokio::test]
    async fn test_default_environment_is_protected() {
        let store = EnvironmentStore::new();
        assert!(store.delete("default").await.is_err());

        store.create("staging", None).await.unwrap();
        assert_eq!(store.list().await.len(), 2);
        store.delete("staging").await.unwrap();
        assert_eq!(store.list().await.len(), 1);
        assert!(store.delete("staging").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_environment_rejected() {
        let store = EnvironmentStore::new();
        store.create("qa", None).await.unwrap();
        assert!(store.create("qa", None).await.is_err());
    }
}
