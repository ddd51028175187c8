//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid {0}: {1}")]
    InvalidField(&'static str, String),
    #[error("unsupported driver: {0} (expected postgres)")]
    UnsupportedDriver(String),
    #[error("config load: {0}")]
    Load(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid config: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("no active target: register a target and switch to it first")]
    NoActiveTarget,
    #[error("query failed: {0}")]
    Query(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Stable machine-readable code, also used as the `error.code` field of HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidConfig(_) => "invalid_config",
            AppError::NotFound(_) => "not_found",
            AppError::Connection(_) => "connection_error",
            AppError::NoActiveTarget => "no_active_target",
            AppError::Query(_) => "query_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidConfig(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Connection(_) => StatusCode::BAD_GATEWAY,
            AppError::NoActiveTarget => StatusCode::CONFLICT,
            AppError::Query(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_wraps_field_error() {
        let err: AppError = ConfigError::MissingField("username").into();
        assert_eq!(err.code(), "invalid_config");
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::NoActiveTarget.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::Connection("refused".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::Query("syntax".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn query_error_keeps_database_diagnostic() {
        let err = AppError::Query("relation \"nope\" does not exist".into());
        assert_eq!(err.to_string(), "query failed: relation \"nope\" does not exist");
    }
}
