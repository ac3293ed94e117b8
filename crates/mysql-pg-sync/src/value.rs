//! SQL value types for database-agnostic row handling.
//!
//! A [`Row`] is an ordered field-name → value mapping built by a fetch and
//! consumed by exactly one insert. [`KeyValue`] is the restricted, hashable
//! and totally ordered subset of values usable for key-set arithmetic.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

/// Type hint for NULL values to ensure correct target encoding.
///
/// Parameters are sent as text with an explicit SQL cast, so a NULL needs
/// to know which cast to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlNullType {
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Bytes,
    Date,
    Time,
    DateTime,
}

/// SQL value enum for type-safe row handling.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL with type hint for correct cast selection.
    Null(SqlNullType),

    /// Boolean value.
    Bool(bool),

    /// Signed integer (covers tinyint through bigint).
    Int(i64),

    /// Floating point (float/double).
    Float(f64),

    /// Decimal value with arbitrary precision.
    Decimal(Decimal),

    /// Text/string data.
    Text(String),

    /// Binary data.
    Bytes(Vec<u8>),

    /// Date without time component.
    Date(NaiveDate),

    /// Time without date component.
    Time(NaiveTime),

    /// Timestamp without timezone.
    DateTime(NaiveDateTime),
}

impl SqlValue {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null(_))
    }

    /// Get the null type hint for this value.
    #[must_use]
    pub fn null_type(&self) -> SqlNullType {
        match self {
            SqlValue::Null(t) => *t,
            SqlValue::Bool(_) => SqlNullType::Bool,
            SqlValue::Int(_) => SqlNullType::Int,
            SqlValue::Float(_) => SqlNullType::Float,
            SqlValue::Decimal(_) => SqlNullType::Decimal,
            SqlValue::Text(_) => SqlNullType::Text,
            SqlValue::Bytes(_) => SqlNullType::Bytes,
            SqlValue::Date(_) => SqlNullType::Date,
            SqlValue::Time(_) => SqlNullType::Time,
            SqlValue::DateTime(_) => SqlNullType::DateTime,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

/// An ordered field-name → value mapping for one fetched row.
///
/// The field set is whatever the originating query selected; field order is
/// preserved for building parameter lists but has no semantic weight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a row from parallel column/value vectors.
    ///
    /// The two vectors must have equal length; extra entries on either
    /// side are truncated.
    #[must_use]
    pub fn from_parts(mut columns: Vec<String>, mut values: Vec<SqlValue>) -> Self {
        let len = columns.len().min(values.len());
        columns.truncate(len);
        values.truncate(len);
        Self { columns, values }
    }

    /// Append a field to the row.
    pub fn push(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.push(column.into());
        self.values.push(value);
    }

    /// Look up a field value by column name.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Field names in selection order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Field values in selection order.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Iterate over (name, value) pairs in selection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if the row has zero fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// The value of a key column for one row.
///
/// Restricted to variants that are hashable and totally ordered, so key
/// sets support set difference and deterministic ascending iteration.
/// Floats and NULLs are excluded; see [`KeyValue::from_sql`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
}

impl KeyValue {
    /// Convert a fetched value into a key value.
    ///
    /// Returns `None` for NULL (a NULL key cannot address rows through an
    /// equality predicate) and for floats (not totally ordered/hashable).
    #[must_use]
    pub fn from_sql(value: &SqlValue) -> Option<KeyValue> {
        match value {
            SqlValue::Null(_) | SqlValue::Float(_) => None,
            SqlValue::Bool(v) => Some(KeyValue::Bool(*v)),
            SqlValue::Int(v) => Some(KeyValue::Int(*v)),
            SqlValue::Decimal(v) => Some(KeyValue::Decimal(*v)),
            SqlValue::Text(v) => Some(KeyValue::Text(v.clone())),
            SqlValue::Bytes(v) => Some(KeyValue::Bytes(v.clone())),
            SqlValue::Date(v) => Some(KeyValue::Date(*v)),
            SqlValue::Time(v) => Some(KeyValue::Time(*v)),
            SqlValue::DateTime(v) => Some(KeyValue::DateTime(*v)),
        }
    }

    /// Convert back to a [`SqlValue`] for use as a query parameter.
    #[must_use]
    pub fn to_sql(&self) -> SqlValue {
        match self {
            KeyValue::Bool(v) => SqlValue::Bool(*v),
            KeyValue::Int(v) => SqlValue::Int(*v),
            KeyValue::Decimal(v) => SqlValue::Decimal(*v),
            KeyValue::Text(v) => SqlValue::Text(v.clone()),
            KeyValue::Bytes(v) => SqlValue::Bytes(v.clone()),
            KeyValue::Date(v) => SqlValue::Date(*v),
            KeyValue::Time(v) => SqlValue::Time(*v),
            KeyValue::DateTime(v) => SqlValue::DateTime(*v),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(v) => write!(f, "{}", v),
            KeyValue::Int(v) => write!(f, "{}", v),
            KeyValue::Decimal(v) => write!(f, "{}", v),
            KeyValue::Text(v) => write!(f, "{}", v),
            KeyValue::Bytes(v) => write!(f, "0x{}", hex::encode(v)),
            KeyValue::Date(v) => write!(f, "{}", v),
            KeyValue::Time(v) => write!(f, "{}", v),
            KeyValue::DateTime(v) => write!(f, "{}", v),
        }
    }
}
