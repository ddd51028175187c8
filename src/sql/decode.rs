//! Convert PostgreSQL rows into [`Row`]s, keeping the server's column order.

use crate::sql::value::{Row, SqlValue};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};

pub fn pg_row_to_row(row: &PgRow) -> Row {
    let mut out = Row::with_capacity(row.columns().len());
    for col in row.columns() {
        out.push(col.name(), cell_to_value(row, col.ordinal()));
    }
    out
}

fn cell_to_value(row: &PgRow, index: usize) -> SqlValue {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return SqlValue::Null,
        Ok(raw) => {
            let name = raw.type_info().name().to_ascii_uppercase();
            name
        }
        Err(_) => return SqlValue::Null,
    };

    let decoded = match type_name.as_str() {
        "BOOL" => row.try_get::<bool, _>(index).map(SqlValue::Bool),
        "INT2" => row.try_get::<i16, _>(index).map(|n| SqlValue::Int(n.into())),
        "INT4" => row.try_get::<i32, _>(index).map(|n| SqlValue::Int(n.into())),
        "INT8" => row.try_get::<i64, _>(index).map(SqlValue::Int),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|n| SqlValue::Float(n.into())),
        "FLOAT8" => row.try_get::<f64, _>(index).map(SqlValue::Float),
        "UUID" => row.try_get::<uuid::Uuid, _>(index).map(SqlValue::Uuid),
        "JSON" | "JSONB" => row.try_get::<serde_json::Value, _>(index).map(SqlValue::Json),
        "DATE" => row.try_get::<chrono::NaiveDate, _>(index).map(SqlValue::Date),
        "TIME" => row.try_get::<chrono::NaiveTime, _>(index).map(SqlValue::Time),
        "TIMESTAMP" => row.try_get::<chrono::NaiveDateTime, _>(index).map(SqlValue::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(SqlValue::TimestampTz),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(SqlValue::Binary),
        // Statements run over the simple query protocol, so every other type arrives as text.
        _ => row.try_get_unchecked::<String, _>(index).map(SqlValue::Text),
    };

    decoded.unwrap_or_else(|e| {
        tracing::warn!(column = index, pg_type = %type_name, error = %e, "undecodable cell, returning null");
        SqlValue::Null
    })
}
