//! Row sanitization and insert statement construction.
//!
//! PostgreSQL rejects NUL bytes inside text fields while MySQL tolerates
//! them, so every row is passed through [`sanitize_row`] before it is
//! handed to the target. Insert statements are parameterized; values are
//! sent as text with an explicit SQL cast per column so the server coerces
//! them to the target column type.

use tokio_postgres::types::ToSql;

use crate::error::{Result, SyncError};
use crate::value::{Row, SqlNullType, SqlValue};

/// Normalize a single field value for cross-database transport.
///
/// Text loses all embedded `0x00` code points and is otherwise unchanged.
/// Binary is decoded as UTF-8 with invalid sequences dropped, NUL-stripped,
/// and returned as text. NULL and every other variant pass through.
pub fn sanitize_value(value: &SqlValue) -> SqlValue {
    match value {
        SqlValue::Text(s) => SqlValue::Text(strip_nuls(s)),
        SqlValue::Bytes(b) => SqlValue::Text(strip_nuls(&decode_utf8_dropping(b))),
        other => other.clone(),
    }
}

/// Apply [`sanitize_value`] field-wise, producing a new row.
///
/// The input row is never mutated; field set and order are preserved.
pub fn sanitize_row(row: &Row) -> Row {
    let mut out = Row::new();
    for (column, value) in row.iter() {
        out.push(column, sanitize_value(value));
    }
    out
}

fn strip_nuls(s: &str) -> String {
    if s.contains('\0') {
        s.replace('\0', "")
    } else {
        s.to_string()
    }
}

/// Decode bytes as UTF-8, dropping invalid sequences instead of replacing
/// them with U+FFFD.
fn decode_utf8_dropping(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let skip = e.error_len().unwrap_or(after.len());
                rest = &after[skip.min(after.len())..];
                if rest.is_empty() {
                    break;
                }
            }
        }
    }
    out
}

/// Get the SQL cast suffix for a value.
fn sql_cast_for_value(value: &SqlValue) -> &'static str {
    match value.null_type() {
        SqlNullType::Bool => "::boolean",
        SqlNullType::Int => "::bigint",
        SqlNullType::Float => "::double precision",
        SqlNullType::Decimal => "::numeric",
        SqlNullType::Text => "::text",
        SqlNullType::Bytes => "::bytea",
        SqlNullType::Date => "::date",
        SqlNullType::Time => "::time",
        SqlNullType::DateTime => "::timestamp",
    }
}

/// Convert a value to a boxed text parameter.
///
/// All values are sent as strings; the cast from [`sql_cast_for_value`]
/// makes the server parse them back into the column type.
fn sql_value_to_param(value: &SqlValue) -> Box<dyn ToSql + Sync + Send> {
    match value {
        SqlValue::Null(_) => Box::new(None::<String>),
        SqlValue::Bool(b) => Box::new(if *b { "t".to_string() } else { "f".to_string() }),
        SqlValue::Int(n) => Box::new(n.to_string()),
        SqlValue::Float(n) => Box::new(n.to_string()),
        SqlValue::Decimal(d) => Box::new(d.to_string()),
        SqlValue::Text(s) => Box::new(s.clone()),
        SqlValue::Bytes(b) => Box::new(format!("\\x{}", hex::encode(b))),
        SqlValue::Date(d) => Box::new(d.to_string()),
        SqlValue::Time(t) => Box::new(t.to_string()),
        SqlValue::DateTime(dt) => Box::new(dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
    }
}

/// Quote a PostgreSQL identifier.
pub fn quote_pg_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Qualify a PostgreSQL table name with schema and proper quoting.
pub fn qualify_pg_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_pg_ident(schema), quote_pg_ident(table))
}

/// A parameterized insert statement.
#[derive(Debug)]
pub struct InsertStatement {
    /// Statement text with `$n` placeholders and per-column casts.
    pub sql: String,
    /// Parameter values in placeholder order.
    pub params: Vec<Box<dyn ToSql + Sync + Send>>,
}

impl InsertStatement {
    /// Borrow the parameters in the form tokio-postgres expects.
    pub fn params_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Build a single-row insert whose column list is exactly the row's fields.
///
/// Target columns absent from the row are left to their defaults. Fails
/// with [`SyncError::EmptyRow`] for a zero-field row; callers treat that
/// as a no-op, not a failure.
pub fn build_insert(schema: &str, table: &str, row: &Row) -> Result<InsertStatement> {
    build_insert_many(schema, table, std::slice::from_ref(row))
}

/// Build a multi-row insert for rows sharing one field set.
pub fn build_insert_many(schema: &str, table: &str, rows: &[Row]) -> Result<InsertStatement> {
    let first = rows.first().ok_or(SyncError::EmptyRow)?;
    if first.is_empty() {
        return Err(SyncError::EmptyRow);
    }
    for row in &rows[1..] {
        if row.columns() != first.columns() {
            return Err(SyncError::schema(
                table,
                "rows in one batch must share a field set",
            ));
        }
    }

    let col_list: String = first
        .columns()
        .iter()
        .map(|c| quote_pg_ident(c))
        .collect::<Vec<_>>()
        .join(", ");

    // Casts are taken per column from the first row; NULLs elsewhere in the
    // column inherit the same cast.
    let col_casts: Vec<&'static str> = first.values().iter().map(sql_cast_for_value).collect();

    let mut placeholders = Vec::with_capacity(rows.len());
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
        Vec::with_capacity(rows.len() * first.len());
    let mut idx = 1;

    for row in rows {
        let row_placeholders: Vec<String> = row
            .values()
            .iter()
            .enumerate()
            .map(|(col_idx, value)| {
                let p = format!("${}{}", idx, col_casts[col_idx]);
                idx += 1;
                params.push(sql_value_to_param(value));
                p
            })
            .collect();
        placeholders.push(format!("({})", row_placeholders.join(", ")));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        qualify_pg_table(schema, table),
        col_list,
        placeholders.join(", ")
    );

    Ok(InsertStatement { sql, params })
}
