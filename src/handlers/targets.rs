//! Target registration handlers: list, register, remove, probe.

use crate::error::AppError;
use crate::registry::ProbeRequest;
use crate::response::{success_many, success_one, success_one_ok};
use crate::state::AppState;
use crate::target::TargetConfig;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub struct TargetView {
    pub name: String,
    #[serde(flatten)]
    pub config: TargetConfig,
}

/// Registration body: the target fields, plus an optional name (defaults to the database name).
#[derive(Deserialize)]
pub struct RegisterTarget {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub config: TargetConfig,
}

/// GET /api/v1/targets: registered targets in registration order.
pub async fn list_targets(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let data: Vec<TargetView> = state
        .registry
        .list_targets()
        .into_iter()
        .map(|(name, config)| TargetView {
            name,
            config: (*config).clone(),
        })
        .collect();
    Ok(success_many(data))
}

/// POST /api/v1/targets: register or overwrite a target.
pub async fn register_target(
    State(state): State<AppState>,
    Json(body): Json<RegisterTarget>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| body.config.default_name())
        .trim()
        .to_string();
    let stored = state.registry.register_target(&name, body.config)?;
    Ok(success_one(TargetView {
        name,
        config: (*stored).clone(),
    }))
}

/// DELETE /api/v1/targets/:name
pub async fn remove_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    state.registry.remove_target(&name)?;
    Ok(success_one_ok(serde_json::json!({ "name": name, "removed": true })))
}

/// POST /api/v1/targets/probe: test credentials and list the server's databases.
pub async fn probe_server(
    State(state): State<AppState>,
    Json(body): Json<ProbeRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if body.host.trim().is_empty() {
        return Err(AppError::BadRequest("host is required".into()));
    }
    let databases = state.registry.probe(&body).await?;
    Ok(success_many(databases))
}
