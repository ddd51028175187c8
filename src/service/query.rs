//! Generic SQL execution against a bound handle.

use crate::connection::TargetConnection;
use crate::error::AppError;
use crate::sql::{Row, StatementKind};
use serde::Serialize;

/// Result of a classified statement: rows for reads, an affected-row count for writes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementOutcome {
    Rows { rows: Vec<Row> },
    Affected {
        #[serde(rename = "rowsAffected")]
        rows_affected: u64,
    },
}

impl StatementOutcome {
    pub fn kind(&self) -> StatementKind {
        match self {
            StatementOutcome::Rows { .. } => StatementKind::Read,
            StatementOutcome::Affected { .. } => StatementKind::Write,
        }
    }
}

pub struct QueryService;

impl QueryService {
    /// Run a row-returning statement. Rows keep the column order the database reported.
    pub async fn read(conn: &dyn TargetConnection, sql: &str) -> Result<Vec<Row>, AppError> {
        if sql.trim().is_empty() {
            return Err(AppError::BadRequest("sql must not be empty".into()));
        }
        conn.fetch_rows(sql).await
    }

    pub async fn write(conn: &dyn TargetConnection, sql: &str) -> Result<u64, AppError> {
        if sql.trim().is_empty() {
            return Err(AppError::BadRequest("sql must not be empty".into()));
        }
        conn.execute(sql).await
    }

    /// Classify by leading keyword and dispatch to [`read`](Self::read) or [`write`](Self::write).
    pub async fn run(conn: &dyn TargetConnection, sql: &str) -> Result<StatementOutcome, AppError> {
        let sql = sql.trim();
        match StatementKind::classify(sql) {
            StatementKind::Read => Ok(StatementOutcome::Rows {
                rows: Self::read(conn, sql).await?,
            }),
            StatementKind::Write => Ok(StatementOutcome::Affected {
                rows_affected: Self::write(conn, sql).await?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqlValue;

    #[test]
    fn outcome_json_uses_camel_case_fields() {
        let json = serde_json::to_value(StatementOutcome::Affected { rows_affected: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "affected", "rowsAffected": 2 }));

        let row: Row = vec![("n", SqlValue::Int(1))].into_iter().collect();
        let json = serde_json::to_value(StatementOutcome::Rows { rows: vec![row] }).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "rows", "rows": [{ "n": 1 }] }));
    }
}
