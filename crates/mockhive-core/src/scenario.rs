//! Scenario rotation: sequential, random and weighted response selection
//!
//! Counter state lives in the store; selection here is a pure function of
//! the configuration and the counter value observed by this request.

use crate::endpoint::DelaySpec;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rotation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    /// Responses cycle in `order`
    #[default]
    Sequential,
    /// Uniform random pick
    Random,
    /// Weighted random pick
    Weighted,
}

/// One response in a scenario rotation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResponse {
    /// Position for sequential mode; missing sorts as 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    /// Weight for weighted mode; missing or non-positive counts as 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// HTTP status
    pub status: u16,
    /// JSON body
    #[serde(default)]
    pub body: serde_json::Value,
    /// Optional per-response delay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<DelaySpec>,
}

/// Scenario configuration attached to an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    /// Whether the rotation is active
    #[serde(default)]
    pub enabled: bool,
    /// Rotation mode
    #[serde(default)]
    pub mode: ScenarioMode,
    /// Responses to rotate through
    #[serde(default)]
    pub responses: Vec<ScenarioResponse>,
    /// Seconds of inactivity after which the counter resets; 0 = never
    #[serde(default)]
    pub reset_after: u64,
    /// In sequential mode, wrap back to the first response after the last
    #[serde(default = "default_loop", rename = "loop")]
    pub looped: bool,
}

fn default_loop() -> bool {
    true
}

/// Per-endpoint counter state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioCounter {
    /// Requests observed so far
    pub count: u64,
    /// Timestamp of the last access, drives auto-reset
    pub last_access: DateTime<Utc>,
}

impl Default for ScenarioCounter {
    fn default() -> Self {
        Self {
            count: 0,
            last_access: Utc::now(),
        }
    }
}

/// Select the response for the request that observed `counter`.
///
/// `counter` is the value read before the store incremented it, so the
/// first request sees 0.
pub fn select_response(config: &ScenarioConfig, counter: u64) -> Option<&ScenarioResponse> {
    if config.responses.is_empty() {
        return None;
    }

    match config.mode {
        ScenarioMode::Sequential => {
            let mut ordered: Vec<&ScenarioResponse> = config.responses.iter().collect();
            ordered.sort_by_key(|r| r.order.unwrap_or(0));
            let n = ordered.len() as u64;
            let index = if config.looped || counter < n {
                (counter % n) as usize
            } else {
                ordered.len() - 1
            };
            Some(ordered[index])
        }
        ScenarioMode::Random => {
            let index = rand::rng().random_range(0..config.responses.len());
            Some(&config.responses[index])
        }
        ScenarioMode::Weighted => {
            let weight_of = |r: &ScenarioResponse| {
                let w = r.weight.unwrap_or(1.0);
                if w > 0.0 {
                    w
                } else {
                    1.0
                }
            };
            let total: f64 = config.responses.iter().map(|r| weight_of(r)).sum();
            let mut sample = rand::rng().random_range(0.0..total);
            for response in &config.responses {
                sample -= weight_of(response);
                if sample < 0.0 {
                    return Some(response);
                }
            }
            // Floating point edge: the sample exhausted every weight.
            config.responses.last()
        }
    }
}
