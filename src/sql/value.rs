//! Normalized result values: a closed set of value kinds and order-preserving rows.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// One cell of a result set.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Binary(Vec<u8>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Bool(b) => serializer.serialize_bool(*b),
            SqlValue::Int(n) => serializer.serialize_i64(*n),
            // NaN and infinities have no JSON form.
            SqlValue::Float(f) if !f.is_finite() => serializer.serialize_str(&f.to_string()),
            SqlValue::Float(f) => serializer.serialize_f64(*f),
            SqlValue::Text(s) => serializer.serialize_str(s),
            SqlValue::Uuid(u) => serializer.serialize_str(&u.to_string()),
            SqlValue::Json(v) => v.serialize(serializer),
            SqlValue::Date(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            SqlValue::Time(t) => serializer.serialize_str(&t.format("%H:%M:%S%.f").to_string()),
            SqlValue::Timestamp(d) => {
                serializer.serialize_str(&d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            SqlValue::TimestampTz(d) => serializer.serialize_str(&d.to_rfc3339()),
            SqlValue::Binary(bytes) => {
                let mut hex = String::with_capacity(2 + bytes.len() * 2);
                hex.push_str("0x");
                for b in bytes {
                    hex.push_str(&format!("{:02X}", b));
                }
                serializer.serialize_str(&hex)
            }
        }
    }
}

/// A result row: (column name, value) pairs in the order the database reported the columns.
///
/// Duplicate column names are kept as separate cells; lookups by name return the first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Row { cells: Vec::new() }
    }

    pub fn with_capacity(n: usize) -> Self {
        Row {
            cells: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.cells.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.cells.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (String, SqlValue)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, SqlValue)>>(iter: I) -> Self {
        Row {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_serializes_in_column_order() {
        let row: Row = vec![
            ("zeta", SqlValue::Int(1)),
            ("alpha", SqlValue::Text("a".into())),
            ("mid", SqlValue::Null),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":"a","mid":null}"#);
    }

    #[test]
    fn duplicate_columns_survive_in_memory() {
        let mut row = Row::new();
        row.push("?column?", SqlValue::Int(1));
        row.push("?column?", SqlValue::Int(2));
        assert_eq!(row.len(), 2);
        assert_eq!(row.get("?column?"), Some(&SqlValue::Int(1)));
    }

    #[test]
    fn typed_values_serialize_to_readable_json() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let row: Row = vec![
            ("d", SqlValue::Date(date)),
            ("b", SqlValue::Binary(vec![0xde, 0xad])),
            ("f", SqlValue::Float(f64::NAN)),
            ("j", SqlValue::Json(serde_json::json!({"k": [1, 2]}))),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["d"], "2024-02-29");
        assert_eq!(json["b"], "0xDEAD");
        assert_eq!(json["f"], "NaN");
        assert_eq!(json["j"]["k"][1], 2);
    }
}
