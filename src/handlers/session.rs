//! Per-caller session handlers: current target, switch, databases on the active server.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::response::{success_many, success_one_ok, success_one_with_meta};
use crate::state::AppState;
use crate::target::TargetConfig;
use crate::tenant::{CallerKey, SwitchOutcome};
use axum::extract::{Path, State};
use serde::Serialize;

#[derive(Serialize)]
pub struct SessionView {
    pub caller: String,
    /// `null` while the caller has not switched to any target.
    pub target: Option<String>,
    pub config: Option<TargetConfig>,
}

pub(crate) fn session_view(state: &AppState, caller: &CallerKey) -> SessionView {
    let binding = state.registry.tenants().current(caller);
    SessionView {
        caller: caller.to_string(),
        target: binding.as_ref().map(|b| b.target.clone()),
        config: binding.map(|b| (*b.config).clone()),
    }
}

/// GET /api/v1/session
pub async fn get_session(
    Caller(caller): Caller,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(success_one_ok(session_view(&state, &caller)))
}

/// POST /api/v1/session/target/:name: bind the caller to a registered target.
pub async fn switch_target(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let outcome = state.registry.switch_target(&caller, &name).await?;
    Ok(success_one_with_meta(
        session_view(&state, &caller),
        serde_json::json!({ "switched": outcome == SwitchOutcome::Switched }),
    ))
}

/// GET /api/v1/session/databases: empty list while unbound.
pub async fn list_databases(
    Caller(caller): Caller,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let databases = state.registry.databases(&caller).await?;
    Ok(success_many(databases))
}
