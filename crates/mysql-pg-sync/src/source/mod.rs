//! MySQL/MariaDB source endpoint.
//!
//! Uses SQLx for connection pooling and async query execution. Row values
//! are decoded into [`SqlValue`] based on each column's own type metadata,
//! so `SELECT *` reads need no prior reflection.

mod types;

pub use types::*;

use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column as _, Row as _, TypeInfo as _, ValueRef as _};
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{Result, SyncError};
use crate::keys::KeyEndpoint;
use crate::value::{KeyValue, Row, SqlNullType, SqlValue};

/// Connection pool acquire timeout.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Read operations against the source database.
#[async_trait]
pub trait SourceReader: KeyEndpoint {
    /// List base table names in the connected database.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Reflect column definitions for a table, in ordinal order.
    ///
    /// An unknown table yields an empty list; callers decide whether that
    /// is fatal.
    async fn reflect_table(&self, table: &str) -> Result<Vec<Column>>;

    /// Fetch one page of rows via offset pagination.
    ///
    /// Offset paging is not safe under concurrent writes to the source
    /// (rows can shift between pages); callers accept that for quiesced
    /// migrations.
    async fn fetch_chunk(&self, table: &str, offset: u64, limit: usize) -> Result<Vec<Row>>;

    /// Fetch every row whose key column equals `key`.
    async fn fetch_rows_by_key(
        &self,
        table: &str,
        key_column: &str,
        key: &KeyValue,
    ) -> Result<Vec<Row>>;

    /// Exact row count for a table.
    async fn row_count(&self, table: &str) -> Result<i64>;
}

/// MySQL/MariaDB source endpoint with connection pooling.
pub struct MysqlEndpoint {
    pool: MySqlPool,
}

impl MysqlEndpoint {
    /// Connect to the source database and verify the connection.
    pub async fn connect(config: &SourceConfig, max_conns: u32) -> Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.user)
            .password(&config.password)
            .ssl_mode(MySqlSslMode::Preferred);

        let pool = MySqlPoolOptions::new()
            .max_connections(max_conns)
            .acquire_timeout(POOL_CONNECTION_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| SyncError::pool(e, "creating MySQL source pool"))?;

        sqlx::query("SELECT 1")
            .fetch_one(&pool)
            .await
            .map_err(|e| SyncError::pool(e, "testing MySQL source connection"))?;

        info!(
            "Connected to MySQL source: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(Self { pool })
    }
}

/// Quote a MySQL identifier.
pub fn quote_mysql_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Classify a raw driver error once at the endpoint boundary.
///
/// MySQL reports an unknown column as SQLSTATE 42S22 (ER_BAD_FIELD_ERROR);
/// that becomes the typed [`SyncError::ColumnNotFound`] so no caller ever
/// inspects message text.
fn classify_source_error(err: sqlx::Error, table: &str, column: &str) -> SyncError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.code().as_deref() == Some("42S22") {
            return SyncError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
                dialect: "mysql",
            };
        }
    }
    SyncError::Source(err)
}

#[async_trait]
impl KeyEndpoint for MysqlEndpoint {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    async fn resolve_primary_key(&self, table: &str) -> Result<Option<String>> {
        // Leading column of the index named exactly PRIMARY.
        let query = r#"
            SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
            FROM INFORMATION_SCHEMA.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME = 'PRIMARY'
            ORDER BY SEQ_IN_INDEX
            LIMIT 1
        "#;

        let row: Option<MySqlRow> = sqlx::query(query)
            .bind(table)
            .fetch_optional(&self.pool)
            .await
            .map_err(SyncError::Source)?;

        let pk = row.map(|r| r.get::<String, _>(0));
        debug!("Primary key for source table '{}': {:?}", table, pk);
        Ok(pk)
    }

    async fn fetch_key_column(&self, table: &str, column: &str) -> Result<Vec<SqlValue>> {
        let sql = format!(
            "SELECT {} FROM {}",
            quote_mysql_ident(column),
            quote_mysql_ident(table)
        );

        let rows: Vec<MySqlRow> = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify_source_error(e, table, column))?;

        Ok(rows.iter().map(|row| decode_value(row, 0)).collect())
    }
}

#[async_trait]
impl SourceReader for MysqlEndpoint {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR(255)) AS TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(SyncError::Source)?;

        Ok(rows.iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn reflect_table(&self, table: &str) -> Result<Vec<Column>> {
        // CAST string columns to CHAR and numerics to SIGNED to sidestep
        // collation and UNSIGNED decoding differences. Very large character
        // lengths (LONGTEXT) are capped to -1, meaning unbounded.
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME,
                CAST(DATA_TYPE AS CHAR(255)) AS DATA_TYPE,
                CAST(CASE
                    WHEN CHARACTER_MAXIMUM_LENGTH IS NULL THEN 0
                    WHEN CHARACTER_MAXIMUM_LENGTH > 2147483647 THEN -1
                    ELSE CHARACTER_MAXIMUM_LENGTH
                END AS SIGNED) AS max_length,
                CAST(COALESCE(NUMERIC_PRECISION, 0) AS SIGNED) AS num_precision,
                CAST(COALESCE(NUMERIC_SCALE, 0) AS SIGNED) AS num_scale,
                CAST(IF(IS_NULLABLE = 'YES', 1, 0) AS SIGNED) AS is_nullable,
                CAST(ORDINAL_POSITION AS SIGNED) AS ordinal_pos
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows: Vec<MySqlRow> = sqlx::query(query)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(SyncError::Source)?;

        let columns: Vec<Column> = rows
            .iter()
            .map(|row| Column {
                name: row.get::<String, _>(0),
                data_type: row.get::<String, _>(1),
                max_length: row.get::<i64, _>(2) as i32,
                precision: row.get::<i64, _>(3) as i32,
                scale: row.get::<i64, _>(4) as i32,
                is_nullable: row.get::<i64, _>(5) == 1,
                ordinal_pos: row.get::<i64, _>(6) as i32,
            })
            .collect();

        debug!("Reflected {} column(s) for table '{}'", columns.len(), table);
        Ok(columns)
    }

    async fn fetch_chunk(&self, table: &str, offset: u64, limit: usize) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {} LIMIT {} OFFSET {}",
            quote_mysql_ident(table),
            limit,
            offset
        );

        let rows: Vec<MySqlRow> = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(SyncError::Source)?;

        Ok(rows.iter().map(decode_row).collect())
    }

    async fn fetch_rows_by_key(
        &self,
        table: &str,
        key_column: &str,
        key: &KeyValue,
    ) -> Result<Vec<Row>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            quote_mysql_ident(table),
            quote_mysql_ident(key_column)
        );

        let query = sqlx::query(&sql);
        let query = match key {
            KeyValue::Bool(v) => query.bind(*v),
            KeyValue::Int(v) => query.bind(*v),
            KeyValue::Decimal(v) => query.bind(*v),
            KeyValue::Text(v) => query.bind(v.clone()),
            KeyValue::Bytes(v) => query.bind(v.clone()),
            KeyValue::Date(v) => query.bind(*v),
            KeyValue::Time(v) => query.bind(*v),
            KeyValue::DateTime(v) => query.bind(*v),
        };

        let rows: Vec<MySqlRow> = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify_source_error(e, table, key_column))?;

        Ok(rows.iter().map(decode_row).collect())
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_mysql_ident(table));

        let row: MySqlRow = sqlx::query(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(SyncError::Source)?;

        Ok(row.get::<i64, _>(0))
    }
}

/// Convert a fetched MySQL row into an ordered field mapping.
fn decode_row(row: &MySqlRow) -> Row {
    let mut out = Row::new();
    for (idx, col) in row.columns().iter().enumerate() {
        out.push(col.name(), decode_value(row, idx));
    }
    out
}

/// Decode one cell based on the column's own type metadata.
fn decode_value(row: &MySqlRow, idx: usize) -> SqlValue {
    let type_name = row.columns()[idx].type_info().name();

    let is_null = row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true);
    if is_null {
        return SqlValue::Null(null_type_for(type_name));
    }

    match type_name {
        "BOOLEAN" => row
            .try_get::<bool, _>(idx)
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null(SqlNullType::Bool)),

        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" | "TINYINT UNSIGNED"
        | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED"
        | "BIT" => decode_int(row, idx),

        "FLOAT" => row
            .try_get::<f32, _>(idx)
            .map(|v| SqlValue::Float(v as f64))
            .unwrap_or(SqlValue::Null(SqlNullType::Float)),
        "DOUBLE" => row
            .try_get::<f64, _>(idx)
            .map(SqlValue::Float)
            .unwrap_or(SqlValue::Null(SqlNullType::Float)),

        "DECIMAL" => row
            .try_get::<rust_decimal::Decimal, _>(idx)
            .map(SqlValue::Decimal)
            .unwrap_or(SqlValue::Null(SqlNullType::Decimal)),

        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(idx)
            .map(SqlValue::Date)
            .unwrap_or(SqlValue::Null(SqlNullType::Date)),
        "TIME" => row
            .try_get::<chrono::NaiveTime, _>(idx)
            .map(SqlValue::Time)
            .unwrap_or(SqlValue::Null(SqlNullType::Time)),
        "DATETIME" => row
            .try_get::<chrono::NaiveDateTime, _>(idx)
            .map(SqlValue::DateTime)
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),
        "TIMESTAMP" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(idx)
            .map(|v| SqlValue::DateTime(v.naive_utc()))
            .unwrap_or(SqlValue::Null(SqlNullType::DateTime)),

        "JSON" => row
            .try_get::<serde_json::Value, _>(idx)
            .map(|v| SqlValue::Text(v.to_string()))
            .unwrap_or(SqlValue::Null(SqlNullType::Text)),

        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => row
            .try_get::<Vec<u8>, _>(idx)
            .map(SqlValue::Bytes)
            .unwrap_or(SqlValue::Null(SqlNullType::Bytes)),

        // CHAR, VARCHAR, the TEXT family, ENUM, SET and anything unknown
        // decode as text, falling back to raw bytes for binary collations.
        _ => row
            .try_get::<String, _>(idx)
            .map(SqlValue::Text)
            .or_else(|_| row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes))
            .unwrap_or(SqlValue::Null(SqlNullType::Text)),
    }
}

fn decode_int(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        SqlValue::Int(v)
    } else if let Ok(v) = row.try_get::<u64, _>(idx) {
        SqlValue::Int(v as i64)
    } else {
        SqlValue::Null(SqlNullType::Int)
    }
}

fn null_type_for(type_name: &str) -> SqlNullType {
    match type_name {
        "BOOLEAN" => SqlNullType::Bool,
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" | "TINYINT UNSIGNED"
        | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "BIGINT UNSIGNED"
        | "BIT" => SqlNullType::Int,
        "FLOAT" | "DOUBLE" => SqlNullType::Float,
        "DECIMAL" => SqlNullType::Decimal,
        "DATE" => SqlNullType::Date,
        "TIME" => SqlNullType::Time,
        "DATETIME" | "TIMESTAMP" => SqlNullType::DateTime,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            SqlNullType::Bytes
        }
        _ => SqlNullType::Text,
    }
}
