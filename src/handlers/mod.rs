//! HTTP handlers for targets, caller sessions, SQL execution and schema metadata.

pub mod metadata;
pub mod query;
pub mod session;
pub mod targets;
