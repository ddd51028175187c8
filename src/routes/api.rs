//! Core API routes: targets, caller session, query execution, metadata.

use crate::handlers::{metadata, query, session, targets};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/targets", get(targets::list_targets).post(targets::register_target))
        .route("/targets/probe", post(targets::probe_server))
        .route("/targets/:name", delete(targets::remove_target))
        .route("/session", get(session::get_session))
        .route("/session/target/:name", post(session::switch_target))
        .route("/session/databases", get(session::list_databases))
        .route("/query", post(query::execute))
        .route("/metadata", get(metadata::overview))
        .route("/metadata/tables", get(metadata::tables))
        .route("/metadata/columns", get(metadata::columns))
        .with_state(state)
}
