//! Process-wide registry: owns the target configs and caller bindings and exposes every core operation.
//!
//! Construct one per process (or per test) and share it behind an `Arc`; nothing here is global.

use crate::connection::{ConnectionFactory, PgConnectionFactory};
use crate::error::AppError;
use crate::service::{MetadataService, QueryService, SchemaOverview, StatementOutcome};
use crate::settings::ConnectionDefaults;
use crate::sql::Row;
use crate::store::ConfigStore;
use crate::target::{derive_connection_url, TargetConfig};
use crate::tenant::{CallerKey, SwitchOutcome, TenantRegistry};
use serde::Deserialize;
use std::sync::Arc;

/// Maintenance database used when probing a server without a target.
pub const PROBE_DATABASE: &str = "postgres";

/// Server credentials to test before registering anything.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRequest {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
}

pub struct Registry {
    store: ConfigStore,
    tenants: TenantRegistry,
    factory: Arc<dyn ConnectionFactory>,
}

impl Registry {
    pub fn new(factory: Arc<dyn ConnectionFactory>, defaults: ConnectionDefaults) -> Self {
        Registry {
            store: ConfigStore::new(defaults),
            tenants: TenantRegistry::new(),
            factory,
        }
    }

    /// Registry that opens real PostgreSQL connections.
    pub fn postgres(defaults: ConnectionDefaults) -> Self {
        Self::new(Arc::new(PgConnectionFactory), defaults)
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn tenants(&self) -> &TenantRegistry {
        &self.tenants
    }

    pub fn register_target(&self, name: &str, config: TargetConfig) -> Result<Arc<TargetConfig>, AppError> {
        let stored = self.store.put(name, config)?;
        tracing::info!(target_name = %name.trim(), host = %stored.config.host, "registered target");
        Ok(stored.config)
    }

    pub fn list_targets(&self) -> Vec<(String, Arc<TargetConfig>)> {
        self.store.list()
    }

    pub fn get_target(&self, name: &str) -> Result<Arc<TargetConfig>, AppError> {
        self.store.get(name).map(|s| s.config)
    }

    pub fn remove_target(&self, name: &str) -> Result<(), AppError> {
        self.store.remove(name)?;
        tracing::info!(target_name = %name, "removed target");
        Ok(())
    }

    pub async fn switch_target(&self, caller: &CallerKey, name: &str) -> Result<SwitchOutcome, AppError> {
        self.tenants
            .switch(caller, name, &self.store, self.factory.as_ref())
            .await
    }

    /// Selected target name; `None` while the caller is unbound.
    pub fn current_target(&self, caller: &CallerKey) -> Option<String> {
        self.tenants.current_name(caller)
    }

    pub fn current_config(&self, caller: &CallerKey) -> Option<Arc<TargetConfig>> {
        self.tenants.current_config(caller)
    }

    pub fn is_bound(&self, caller: &CallerKey) -> bool {
        self.tenants.is_bound(caller)
    }

    pub async fn run_read(&self, caller: &CallerKey, sql: &str) -> Result<Vec<Row>, AppError> {
        let conn = self.tenants.connection(caller)?;
        QueryService::read(conn.as_ref(), sql).await
    }

    pub async fn run_write(&self, caller: &CallerKey, sql: &str) -> Result<u64, AppError> {
        let conn = self.tenants.connection(caller)?;
        QueryService::write(conn.as_ref(), sql).await
    }

    pub async fn run_statement(&self, caller: &CallerKey, sql: &str) -> Result<StatementOutcome, AppError> {
        let conn = self.tenants.connection(caller)?;
        QueryService::run(conn.as_ref(), sql).await
    }

    pub async fn table_metadata(&self, caller: &CallerKey) -> Result<Vec<Row>, AppError> {
        let conn = self.tenants.connection(caller)?;
        MetadataService::tables(conn.as_ref()).await
    }

    pub async fn column_metadata(&self, caller: &CallerKey) -> Result<Vec<Row>, AppError> {
        let conn = self.tenants.connection(caller)?;
        MetadataService::columns(conn.as_ref()).await
    }

    pub async fn schema_overview(&self, caller: &CallerKey) -> Result<SchemaOverview, AppError> {
        let conn = self.tenants.connection(caller)?;
        MetadataService::overview(conn.as_ref()).await
    }

    /// Databases on the caller's active server; empty while unbound.
    pub async fn databases(&self, caller: &CallerKey) -> Result<Vec<String>, AppError> {
        match self.tenants.connection(caller) {
            Ok(conn) => MetadataService::databases(conn.as_ref()).await,
            Err(AppError::NoActiveTarget) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Open a throwaway connection to the server's maintenance database and list its databases.
    pub async fn probe(&self, request: &ProbeRequest) -> Result<Vec<String>, AppError> {
        let defaults = self.store.defaults();
        let port = request.port.unwrap_or(defaults.default_port);
        let url = derive_connection_url(&request.host, port, PROBE_DATABASE, defaults)?;
        let conn = self
            .factory
            .open(&url, &request.username, &request.password)
            .await?;
        let result = MetadataService::databases(conn.as_ref()).await;
        conn.close().await;
        tracing::debug!(host = %request.host, port, ok = result.is_ok(), "probed server");
        result
    }

    /// Close every bound connection. Call once at process stop.
    pub async fn shutdown(&self) {
        let bound = self.tenants.bound_callers();
        self.tenants.close_all().await;
        tracing::info!(bound, "registry shut down");
    }
}
