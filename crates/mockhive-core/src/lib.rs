//! # MockHive Core
//!
//! Core functionality and shared logic for the MockHive mock server.
//!
//! This crate provides the foundational building blocks used across all
//! MockHive protocols (HTTP, WebSocket, GraphQL):
//!
//! - **Endpoint registry**: ordered, concurrency-safe store with history
//!   and atomic file persistence
//! - **Path matching**: literal and `:param` pattern resolution
//! - **Request shaping**: conditional responses, scenario rotation,
//!   environment overlays and template expansion
//! - **Traffic controls**: authentication simulation, fixed-window rate
//!   limiting and upstream proxying with response caching
//! - **Observability**: ring-buffered request logging
//!
//! The protocol crates (`mockhive-http`, `mockhive-ws`,
//! `mockhive-graphql`) consume these pieces; the store is the single
//! authority on shared state and hands out immutable snapshots.

pub mod auth;
pub mod conditions;
pub mod endpoint;
pub mod environment;
pub mod error;
pub mod history;
pub mod matcher;
pub mod persistence;
pub mod proxy;
pub mod rate_limit;
pub mod request;
pub mod request_log;
pub mod scenario;
pub mod store;
pub mod template;

pub use auth::{AuthConfig, AuthMethod, AuthOutcome};
pub use conditions::{Condition, ConditionOperator, ConditionSource, ConditionalResponse};
pub use endpoint::{
    DelaySpec, Endpoint, EndpointDraft, EndpointStatus, HttpMethod, ResponseSpec,
};
pub use environment::{
    EnvironmentDef, EnvironmentOverride, EnvironmentSettings, EnvironmentStore,
};
pub use error::{Error, Result};
pub use history::{HistoryAction, HistoryEntry};
pub use matcher::{PathMatch, PathPattern};
pub use proxy::{ProxyConfig, ProxyForwarder, ProxyResponse};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use request::RequestContext;
pub use request_log::{LogQuery, LogStats, RequestLog, RequestLogger};
pub use scenario::{ScenarioConfig, ScenarioCounter, ScenarioMode, ScenarioResponse};
pub use store::EndpointStore;
