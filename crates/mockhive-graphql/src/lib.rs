//! # MockHive GraphQL
//!
//! GraphQL mock engine for MockHive.
//!
//! Any POST to a registered endpoint path is treated as a GraphQL
//! request (`{query, operationName?, variables?}`). The operation type
//! and name are parsed from the document, resolvers are matched in
//! order on name, type and variable equality, and the first match's
//! `{data, errors?}` is returned. Endpoints may declare a default
//! response for unmatched operations.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use mockhive_graphql::{graphql_admin_router, graphql_router, GraphQLRegistry};
//! use std::sync::Arc;
//!
//! # fn example() {
//! let registry = Arc::new(GraphQLRegistry::new());
//! let app = axum::Router::new()
//!     .nest("/api/admin/graphql", graphql_admin_router(Arc::clone(&registry)))
//!     .fallback_service(graphql_router(registry));
//! # let _ = app;
//! # }
//! ```

pub mod admin;
pub mod handlers;
pub mod registry;
pub mod types;

pub use admin::graphql_admin_router;
pub use handlers::graphql_router;
pub use registry::{GraphQLLogEntry, GraphQLRegistry};
pub use types::{
    parse_operation, GraphQLEndpoint, GraphQLEndpointDraft, GraphQLRequest, GraphQLResolver,
    GraphQLResolverDraft, OperationType,
};
