//! Schema metadata handlers for the caller's active target.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::response::{success_many, success_one_ok};
use crate::state::AppState;
use axum::extract::State;

/// GET /api/v1/metadata: table names and columns grouped by lowercase table name.
pub async fn overview(
    Caller(caller): Caller,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(success_one_ok(state.registry.schema_overview(&caller).await?))
}

/// GET /api/v1/metadata/tables
pub async fn tables(
    Caller(caller): Caller,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(success_many(state.registry.table_metadata(&caller).await?))
}

/// GET /api/v1/metadata/columns
pub async fn columns(
    Caller(caller): Caller,
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    Ok(success_many(state.registry.column_metadata(&caller).await?))
}
