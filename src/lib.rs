//! SQL switchboard: tenant-scoped connection registry and generic SQL execution over PostgreSQL.

pub mod connection;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;
pub mod target;
pub mod tenant;

pub use connection::{ConnectionFactory, PgConnectionFactory, TargetConnection};
pub use error::{AppError, ConfigError};
pub use registry::{ProbeRequest, Registry};
pub use routes::{api_routes, app, common_routes};
pub use service::{SchemaOverview, StatementOutcome};
pub use settings::{ConnectionDefaults, Settings};
pub use sql::{Row, SqlValue, StatementKind};
pub use state::AppState;
pub use store::ConfigStore;
pub use target::{derive_connection_url, TargetConfig};
pub use tenant::{CallerKey, SwitchOutcome, TenantBinding, TenantRegistry};
