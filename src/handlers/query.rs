//! SQL execution handler.

use crate::error::AppError;
use crate::extractors::Caller;
use crate::response::success_one_with_meta;
use crate::service::StatementOutcome;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct QueryRequest {
    pub sql: String,
    /// Switch to this target before executing.
    #[serde(default)]
    pub target: Option<String>,
}

/// POST /api/v1/query: classify by leading keyword, return rows or an affected-row count.
pub async fn execute(
    Caller(caller): Caller,
    State(state): State<AppState>,
    Json(body): Json<QueryRequest>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    if let Some(target) = body.target.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        state.registry.switch_target(&caller, target).await?;
    }

    let outcome = match state.registry.run_statement(&caller, &body.sql).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, AppError::Query(_)) {
                tracing::warn!(caller = %caller, error = %e, "statement failed");
            }
            return Err(e);
        }
    };

    let meta = match &outcome {
        StatementOutcome::Rows { rows } => serde_json::json!({ "count": rows.len() }),
        StatementOutcome::Affected { rows_affected } => serde_json::json!({ "rowsAffected": rows_affected }),
    };
    Ok(success_one_with_meta(outcome, meta))
}
