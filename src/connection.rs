//! Connection factory: turns a connection URL plus credentials into a live handle.

use crate::error::AppError;
use crate::sql::{pg_row_to_row, Row};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgDatabaseError, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::sync::Arc;

/// A live handle to one target database. Shared by every in-flight operation of its binding.
#[async_trait]
pub trait TargetConnection: Send + Sync {
    /// Run `sql` verbatim and return every row it produced.
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, AppError>;

    /// Run `sql` verbatim and return the driver's affected-row count.
    async fn execute(&self, sql: &str) -> Result<u64, AppError>;

    /// Release the underlying resources now. Later calls on this handle fail.
    ///
    /// Handles replaced by a switch are not closed this way; they are released once the last
    /// in-flight user drops its reference.
    async fn close(&self);
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a handle eagerly; configuration and transport errors surface here as `Connection`.
    async fn open(
        &self,
        connection_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<dyn TargetConnection>, AppError>;
}

/// Opens PostgreSQL handles through sqlx. Each handle is a pool capped at one connection.
#[derive(Clone, Debug, Default)]
pub struct PgConnectionFactory;

#[async_trait]
impl ConnectionFactory for PgConnectionFactory {
    async fn open(
        &self,
        connection_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Arc<dyn TargetConnection>, AppError> {
        let mut opts = PgConnectOptions::from_str(connection_url)
            .map_err(|e| AppError::Connection(format!("invalid connection url: {}", e)))?
            .username(username)
            .password(password);
        // The URL form keeps IPv6 brackets in the host; the socket address must not.
        if let Some(ip) = opts
            .get_host()
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .map(str::to_string)
        {
            opts = opts.host(&ip);
        }
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .connect_with(opts)
            .await
            .map_err(|e| AppError::Connection(e.to_string()))?;
        Ok(Arc::new(PgTarget { pool }))
    }
}

pub struct PgTarget {
    pool: PgPool,
}

#[async_trait]
impl TargetConnection for PgTarget {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %sql, "query");
        let rows = sqlx::raw_sql(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(rows.iter().map(pg_row_to_row).collect())
    }

    async fn execute(&self, sql: &str) -> Result<u64, AppError> {
        tracing::debug!(sql = %sql, "execute");
        let done = sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(done.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

impl Drop for PgTarget {
    fn drop(&mut self) {
        if self.pool.is_closed() {
            return;
        }
        let pool = self.pool.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                pool.close().await;
            });
        }
    }
}

fn query_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db) => {
            let (detail, hint) = db
                .try_downcast_ref::<PgDatabaseError>()
                .map(|pg| (pg.detail(), pg.hint()))
                .unwrap_or((None, None));
            AppError::Query(diagnostic(db.message(), db.code().as_deref(), detail, hint))
        }
        e @ (sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_)) => {
            AppError::Connection(e.to_string())
        }
        other => AppError::Query(other.to_string()),
    }
}

/// Server diagnostic as reported: message, SQLSTATE, then DETAIL and HINT lines when present.
fn diagnostic(message: &str, code: Option<&str>, detail: Option<&str>, hint: Option<&str>) -> String {
    let mut out = message.to_string();
    if let Some(code) = code {
        out.push_str(&format!(" (SQLSTATE {})", code));
    }
    if let Some(detail) = detail {
        out.push_str("\nDETAIL: ");
        out.push_str(detail);
    }
    if let Some(hint) = hint {
        out.push_str("\nHINT: ");
        out.push_str(hint);
    }
    out
}
