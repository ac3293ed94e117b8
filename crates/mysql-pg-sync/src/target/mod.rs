//! PostgreSQL target endpoint.
//!
//! All writes go through here: DDL generation from mapped columns, single
//! row inserts, and transactional batch inserts. Reads are limited to what
//! reconciliation and count comparison need.

use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::error::SqlState;
use tokio_postgres::{Config as PgConfig, NoTls};
use tracing::{debug, info};

use crate::codec::{self, qualify_pg_table, quote_pg_ident};
use crate::config::TargetConfig;
use crate::error::{Result, SyncError};
use crate::keys::KeyEndpoint;
use crate::typemap::ColumnMapping;
use crate::value::{Row, SqlNullType, SqlValue};

/// PostgreSQL's protocol limit on parameters per statement.
const MAX_PARAMS_PER_STATEMENT: usize = 65_535;

/// Write operations against the target database.
#[async_trait]
pub trait TargetWriter: KeyEndpoint {
    /// List base table names in the target schema.
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Create a table from mapped column definitions.
    async fn create_table(&self, table: &str, columns: &[ColumnMapping]) -> Result<()>;

    /// Drop a table if it exists; a no-op when absent.
    async fn drop_table(&self, table: &str) -> Result<()>;

    /// Insert one row whose column list is exactly the row's field set.
    ///
    /// A zero-field row is a no-op returning 0.
    async fn insert_row(&self, table: &str, row: &Row) -> Result<u64>;

    /// Insert rows sharing one field set inside a single transaction.
    ///
    /// A mid-batch failure rolls the whole batch back; earlier committed
    /// batches stay committed.
    async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<u64>;

    /// Exact row count for a table.
    async fn row_count(&self, table: &str) -> Result<i64>;
}

/// PostgreSQL target endpoint with connection pooling.
pub struct PgEndpoint {
    pool: Pool,
    schema: String,
}

impl PgEndpoint {
    /// Connect to the target database and verify the connection.
    pub async fn connect(config: &TargetConfig, max_conns: usize) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.dbname(&config.database);
        pg_config.user(&config.user);
        pg_config.password(&config.password);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = Manager::from_config(pg_config, NoTls, mgr_config);
        let pool = Pool::builder(mgr)
            .max_size(max_conns)
            .build()
            .map_err(|e| SyncError::pool(e, "creating PostgreSQL target pool"))?;

        let client = pool
            .get()
            .await
            .map_err(|e| SyncError::pool(e, "testing PostgreSQL target connection"))?;
        client.simple_query("SELECT 1").await?;

        info!(
            "Connected to PostgreSQL target: {}:{}/{} (schema {})",
            config.host, config.port, config.database, config.schema
        );

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    /// Target schema all table names are qualified with.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| SyncError::pool(e, "acquiring PostgreSQL connection"))
    }
}

/// Render the CREATE TABLE statement for a set of mapped columns.
fn generate_ddl(schema: &str, table: &str, columns: &[ColumnMapping]) -> String {
    let mut ddl = format!("CREATE TABLE {} (\n", qualify_pg_table(schema, table));

    for (i, col) in columns.iter().enumerate() {
        let nullable = if col.is_nullable { "" } else { " NOT NULL" };
        ddl.push_str(&format!(
            "    {} {}{}",
            quote_pg_ident(&col.name),
            col.target_type,
            nullable
        ));
        if i < columns.len() - 1 {
            ddl.push_str(",\n");
        } else {
            ddl.push('\n');
        }
    }

    ddl.push(')');
    ddl
}

/// Classify a raw driver error once at the endpoint boundary.
///
/// PostgreSQL reports an unknown column as SQLSTATE 42703; that becomes
/// the typed [`SyncError::ColumnNotFound`] so no caller ever inspects
/// message text.
fn classify_target_error(err: tokio_postgres::Error, table: &str, column: &str) -> SyncError {
    if err.code() == Some(&SqlState::UNDEFINED_COLUMN) {
        return SyncError::ColumnNotFound {
            table: table.to_string(),
            column: column.to_string(),
            dialect: "postgres",
        };
    }
    SyncError::Target(err)
}

#[async_trait]
impl KeyEndpoint for PgEndpoint {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    async fn resolve_primary_key(&self, table: &str) -> Result<Option<String>> {
        let client = self.client().await?;

        // First column of the PRIMARY KEY constraint, if one is declared.
        let row = client
            .query_opt(
                "SELECT kcu.column_name
                 FROM information_schema.table_constraints tc
                 JOIN information_schema.key_column_usage kcu
                   ON tc.constraint_name = kcu.constraint_name
                  AND tc.table_schema = kcu.table_schema
                 WHERE tc.constraint_type = 'PRIMARY KEY'
                   AND tc.table_schema = $1
                   AND tc.table_name = $2
                 ORDER BY kcu.ordinal_position
                 LIMIT 1",
                &[&self.schema, &table],
            )
            .await?;

        if let Some(row) = row {
            let pk: String = row.get(0);
            debug!("Primary key for target table '{}': {}", table, pk);
            return Ok(Some(pk));
        }

        // Some source schemas never declare a primary key but still carry a
        // de-facto unique `sid` column on session/form-submission tables.
        let row = client
            .query_one(
                "SELECT EXISTS (
                    SELECT 1 FROM information_schema.columns
                    WHERE table_schema = $1 AND table_name = $2 AND column_name = 'sid'
                )",
                &[&self.schema, &table],
            )
            .await?;

        if row.get::<_, bool>(0) {
            debug!("Falling back to 'sid' column for target table '{}'", table);
            Ok(Some("sid".to_string()))
        } else {
            Ok(None)
        }
    }

    async fn fetch_key_column(&self, table: &str, column: &str) -> Result<Vec<SqlValue>> {
        let client = self.client().await?;
        let sql = format!(
            "SELECT {} FROM {}",
            quote_pg_ident(column),
            qualify_pg_table(&self.schema, table)
        );

        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| classify_target_error(e, table, column))?;

        Ok(rows.iter().map(|row| decode_value(row, 0)).collect())
    }
}

#[async_trait]
impl TargetWriter for PgEndpoint {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT table_name FROM information_schema.tables
                 WHERE table_schema = $1 AND table_type = 'BASE TABLE'
                 ORDER BY table_name",
                &[&self.schema],
            )
            .await?;

        Ok(rows.iter().map(|r| r.get::<_, String>(0)).collect())
    }

    async fn create_table(&self, table: &str, columns: &[ColumnMapping]) -> Result<()> {
        if columns.is_empty() {
            return Err(SyncError::schema(table, "no columns to create"));
        }

        let client = self.client().await?;
        let ddl = generate_ddl(&self.schema, table, columns);
        client
            .execute(&ddl, &[])
            .await
            .map_err(|e| SyncError::schema(table, format!("create failed: {}", e)))?;

        debug!("Created table {}.{}", self.schema, table);
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        let client = self.client().await?;
        let sql = format!(
            "DROP TABLE IF EXISTS {}",
            qualify_pg_table(&self.schema, table)
        );
        client
            .execute(&sql, &[])
            .await
            .map_err(|e| SyncError::schema(table, format!("drop failed: {}", e)))?;

        debug!("Dropped table {}.{} (if it existed)", self.schema, table);
        Ok(())
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<u64> {
        if row.is_empty() {
            return Ok(0);
        }

        let client = self.client().await?;
        let stmt = codec::build_insert(&self.schema, table, row)?;
        let count = client.execute(&stmt.sql, &stmt.params_refs()).await?;
        Ok(count)
    }

    async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        // Statements are split under the protocol's parameter cap but share
        // one transaction, so the batch commits or rolls back as a unit.
        let fields = rows[0].len().max(1);
        let rows_per_stmt = (MAX_PARAMS_PER_STATEMENT / fields).max(1);

        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let mut total = 0u64;
        for chunk in rows.chunks(rows_per_stmt) {
            let stmt = codec::build_insert_many(&self.schema, table, chunk)?;
            total += tx.execute(&stmt.sql, &stmt.params_refs()).await?;
        }

        tx.commit().await?;
        Ok(total)
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        let client = self.client().await?;
        let sql = format!(
            "SELECT COUNT(*) FROM {}",
            qualify_pg_table(&self.schema, table)
        );
        let row = client.query_one(&sql, &[]).await?;
        Ok(row.get(0))
    }
}

/// Decode one cell based on the column's own type metadata.
fn decode_value(row: &tokio_postgres::Row, idx: usize) -> SqlValue {
    let type_name = row.columns()[idx].type_().name();

    match type_name {
        "bool" => decode_opt(row, idx, SqlValue::Bool, SqlNullType::Bool),

        "int2" => decode_opt(row, idx, |v: i16| SqlValue::Int(v as i64), SqlNullType::Int),
        "int4" => decode_opt(row, idx, |v: i32| SqlValue::Int(v as i64), SqlNullType::Int),
        "int8" => decode_opt(row, idx, SqlValue::Int, SqlNullType::Int),

        "float4" => decode_opt(
            row,
            idx,
            |v: f32| SqlValue::Float(v as f64),
            SqlNullType::Float,
        ),
        "float8" => decode_opt(row, idx, SqlValue::Float, SqlNullType::Float),

        "numeric" => decode_opt(row, idx, SqlValue::Decimal, SqlNullType::Decimal),

        "bytea" => decode_opt(row, idx, SqlValue::Bytes, SqlNullType::Bytes),

        "date" => decode_opt(row, idx, SqlValue::Date, SqlNullType::Date),
        "time" => decode_opt(row, idx, SqlValue::Time, SqlNullType::Time),
        "timestamp" => decode_opt(row, idx, SqlValue::DateTime, SqlNullType::DateTime),
        "timestamptz" => decode_opt(
            row,
            idx,
            |v: chrono::DateTime<chrono::Utc>| SqlValue::DateTime(v.naive_utc()),
            SqlNullType::DateTime,
        ),

        // text, varchar, bpchar, name and anything unknown decode as text.
        _ => decode_opt(row, idx, SqlValue::Text, SqlNullType::Text),
    }
}

fn decode_opt<'a, T>(
    row: &'a tokio_postgres::Row,
    idx: usize,
    wrap: impl Fn(T) -> SqlValue,
    null_type: SqlNullType,
) -> SqlValue
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .ok()
        .flatten()
        .map(wrap)
        .unwrap_or(SqlValue::Null(null_type))
}
