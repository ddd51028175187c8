//! Schema descriptors read from information_schema through the bound handle.

use crate::connection::TargetConnection;
use crate::error::AppError;
use crate::sql::Row;
use serde::Serialize;
use std::collections::BTreeMap;

pub const TABLE_NAME: &str = "TABLE_NAME";
pub const COLUMN_NAME: &str = "COLUMN_NAME";

const TABLES_SQL: &str = r#"SELECT table_schema::text AS "TABLE_SCHEMA", table_name::text AS "TABLE_NAME", table_type::text AS "TABLE_TYPE"
FROM information_schema.tables
WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
ORDER BY table_schema, table_name"#;

const COLUMNS_SQL: &str = r#"SELECT table_schema::text AS "TABLE_SCHEMA", table_name::text AS "TABLE_NAME", column_name::text AS "COLUMN_NAME",
       data_type::text AS "DATA_TYPE", is_nullable::text AS "IS_NULLABLE", ordinal_position::int AS "ORDINAL_POSITION"
FROM information_schema.columns
WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
ORDER BY table_schema, table_name, ordinal_position"#;

const DATABASES_SQL: &str =
    "SELECT datname::text AS name FROM pg_database WHERE NOT datistemplate ORDER BY datname";

/// Table names plus column names grouped by lowercase table name, for client-side autocomplete.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOverview {
    pub table_names: Vec<String>,
    pub table_columns: BTreeMap<String, Vec<String>>,
}

impl SchemaOverview {
    /// Pure transform over raw descriptors. Tables without columns get an empty group;
    /// repeated (table, column) rows are collapsed; rows without a table name are skipped.
    pub fn build(tables: &[Row], columns: &[Row]) -> Self {
        let mut table_names = Vec::with_capacity(tables.len());
        let mut table_columns: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for row in tables {
            if let Some(name) = row.get(TABLE_NAME).and_then(|v| v.as_str()) {
                table_names.push(name.to_string());
                table_columns.entry(name.to_lowercase()).or_default();
            }
        }

        for row in columns {
            let Some(table) = row.get(TABLE_NAME).and_then(|v| v.as_str()) else {
                continue;
            };
            let group = table_columns.entry(table.to_lowercase()).or_default();
            if let Some(column) = row.get(COLUMN_NAME).and_then(|v| v.as_str()) {
                if !group.iter().any(|c| c == column) {
                    group.push(column.to_string());
                }
            }
        }

        SchemaOverview {
            table_names,
            table_columns,
        }
    }
}

pub struct MetadataService;

impl MetadataService {
    pub async fn tables(conn: &dyn TargetConnection) -> Result<Vec<Row>, AppError> {
        conn.fetch_rows(TABLES_SQL).await
    }

    pub async fn columns(conn: &dyn TargetConnection) -> Result<Vec<Row>, AppError> {
        conn.fetch_rows(COLUMNS_SQL).await
    }

    pub async fn overview(conn: &dyn TargetConnection) -> Result<SchemaOverview, AppError> {
        let tables = Self::tables(conn).await?;
        let columns = Self::columns(conn).await?;
        Ok(SchemaOverview::build(&tables, &columns))
    }

    /// Names of the databases on the server behind `conn`.
    pub async fn databases(conn: &dyn TargetConnection) -> Result<Vec<String>, AppError> {
        let rows = conn.fetch_rows(DATABASES_SQL).await?;
        Ok(rows
            .iter()
            .filter_map(|r| r.values().next().and_then(|v| v.as_str()).map(String::from))
            .collect())
    }
}
