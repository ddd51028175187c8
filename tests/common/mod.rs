//! In-process fakes for the connection factory so registry behavior is testable without a server.
#![allow(dead_code)]

use async_trait::async_trait;
use sql_switchboard::{
    AppError, ConnectionDefaults, ConnectionFactory, Registry, Row, SqlValue, TargetConfig,
    TargetConnection,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// What a test can observe about one opened handle, including after the handle is gone.
pub struct HandleState {
    pub url: String,
    closed: AtomicBool,
    dropped: AtomicBool,
}

impl HandleState {
    /// Closed explicitly through `TargetConnection::close`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Every reference to the handle has been dropped.
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.is_closed() || self.is_dropped()
    }
}

pub struct FakeConnection {
    state: Arc<HandleState>,
    pub username: String,
    gate: Arc<Notify>,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.state.dropped.store(true, Ordering::SeqCst);
    }
}

impl FakeConnection {
    fn ensure_open(&self) -> Result<(), AppError> {
        if self.state.is_closed() {
            return Err(AppError::Connection("pool closed".into()));
        }
        Ok(())
    }

    fn text_rows(column: &str, values: &[&str]) -> Vec<Row> {
        values
            .iter()
            .map(|v| vec![(column, SqlValue::Text(v.to_string()))].into_iter().collect::<Row>())
            .collect()
    }
}

#[async_trait]
impl TargetConnection for FakeConnection {
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>, AppError> {
        self.ensure_open()?;
        let lower = sql.trim().to_ascii_lowercase();
        if lower == "select 1" {
            return Ok(vec![vec![("", SqlValue::Int(1))].into_iter().collect()]);
        }
        if lower.starts_with("select boom") {
            return Err(AppError::Query("syntax error at or near \"boom\"".into()));
        }
        if lower.starts_with("select wait") {
            self.gate.notified().await;
        }
        if lower.contains("information_schema.tables") {
            return Ok(Self::text_rows("TABLE_NAME", &["Orders", "audit"]));
        }
        if lower.contains("information_schema.columns") {
            let rows = [("Orders", "id"), ("Orders", "total"), ("orders", "total")]
                .iter()
                .map(|(t, c)| {
                    vec![
                        ("TABLE_NAME", SqlValue::Text(t.to_string())),
                        ("COLUMN_NAME", SqlValue::Text(c.to_string())),
                    ]
                    .into_iter()
                    .collect::<Row>()
                })
                .collect();
            return Ok(rows);
        }
        if lower.contains("pg_database") {
            return Ok(Self::text_rows("name", &["postgres", "sales"]));
        }
        Ok(vec![vec![
            ("url", SqlValue::Text(self.state.url.clone())),
            ("user", SqlValue::Text(self.username.clone())),
        ]
        .into_iter()
        .collect()])
    }

    async fn execute(&self, sql: &str) -> Result<u64, AppError> {
        self.ensure_open()?;
        if sql.to_ascii_lowercase().contains("boom") {
            return Err(AppError::Query("relation \"boom\" does not exist".into()));
        }
        Ok(3)
    }

    async fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

/// Counts opens, tracks every handle's state, and refuses URLs containing a configured fragment.
#[derive(Default)]
pub struct FakeFactory {
    opens: AtomicUsize,
    refuse: Mutex<Vec<String>>,
    opened: Mutex<Vec<Arc<HandleState>>>,
    /// Released by `release_waiters`; `select wait` queries block on it.
    pub gate: Arc<Notify>,
}

impl FakeFactory {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn refuse(&self, fragment: &str) {
        self.refuse.lock().unwrap().push(fragment.to_string());
    }

    pub fn opened(&self) -> Vec<Arc<HandleState>> {
        self.opened.lock().unwrap().clone()
    }

    pub fn release_waiters(&self) {
        self.gate.notify_waiters();
    }
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    async fn open(
        &self,
        connection_url: &str,
        username: &str,
        _password: &str,
    ) -> Result<Arc<dyn TargetConnection>, AppError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let refused = self
            .refuse
            .lock()
            .unwrap()
            .iter()
            .any(|f| connection_url.contains(f.as_str()));
        if refused {
            return Err(AppError::Connection(format!("connection refused: {}", connection_url)));
        }
        let state = Arc::new(HandleState {
            url: connection_url.to_string(),
            closed: AtomicBool::new(false),
            dropped: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(state.clone());
        Ok(Arc::new(FakeConnection {
            state,
            username: username.to_string(),
            gate: self.gate.clone(),
        }))
    }
}

pub fn registry() -> (Arc<FakeFactory>, Arc<Registry>) {
    let factory = Arc::new(FakeFactory::default());
    let registry = Arc::new(Registry::new(factory.clone(), ConnectionDefaults::default()));
    (factory, registry)
}

pub fn reporting_config() -> TargetConfig {
    TargetConfig::new("db1", 1433, "sales", "sa", "x")
}

pub fn url_of(row: &Row) -> String {
    row.get("url")
        .and_then(|v| v.as_str())
        .map(String::from)
        .unwrap_or_default()
}

/// Let spawned tasks run.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
