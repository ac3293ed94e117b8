//! Key-set fetching with automatic primary-key fallback.
//!
//! A key set is the full set of key-column values for one table on one
//! endpoint, materialized in memory per operation. When the requested
//! column does not exist, the endpoint's catalog is consulted once for a
//! usable key column and the fetch is retried exactly once; anything else
//! is fatal, because reconciliation without a reliable key cannot
//! guarantee correctness.

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::value::{KeyValue, SqlValue};

/// Key-related operations shared by both endpoints.
#[async_trait]
pub trait KeyEndpoint: Send + Sync {
    /// Dialect label used in logs and error context ("mysql" / "postgres").
    fn dialect(&self) -> &'static str;

    /// Determine the column that uniquely identifies a row, if any.
    ///
    /// Consults native catalog metadata first; the PostgreSQL side
    /// additionally falls back to a column literally named `sid`.
    /// Returns `Ok(None)` when nothing is found, never an error.
    async fn resolve_primary_key(&self, table: &str) -> Result<Option<String>>;

    /// Fetch every value of one column. Raises the typed
    /// [`SyncError::ColumnNotFound`] when the column is absent.
    async fn fetch_key_column(&self, table: &str, column: &str) -> Result<Vec<SqlValue>>;
}

/// The key set for one table on one endpoint, plus the column that was
/// actually used to build it (the nominal column, or the resolved one).
#[derive(Debug, Clone)]
pub struct KeySet {
    /// Column the values were read from.
    pub column: String,
    /// Distinct key values in ascending order.
    pub keys: BTreeSet<KeyValue>,
}

impl KeySet {
    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Fetch the full key set for a table.
///
/// Tries `key_column` first. On [`SyncError::ColumnNotFound`] the
/// endpoint's primary key is resolved and the fetch retried once with the
/// resolved column; a resolver miss is [`SyncError::KeyResolution`]. Any
/// other failure propagates unchanged.
pub async fn fetch_keys<E: KeyEndpoint + ?Sized>(
    endpoint: &E,
    table: &str,
    key_column: &str,
) -> Result<KeySet> {
    match endpoint.fetch_key_column(table, key_column).await {
        Ok(values) => Ok(KeySet {
            column: key_column.to_string(),
            keys: collect_keys(table, key_column, values),
        }),
        Err(err) if err.is_column_not_found() => {
            warn!(
                "Column '{}' not found on table '{}' ({}); resolving primary key from catalog",
                key_column,
                table,
                endpoint.dialect()
            );
            let resolved = endpoint.resolve_primary_key(table).await?.ok_or_else(|| {
                SyncError::KeyResolution {
                    table: table.to_string(),
                    dialect: endpoint.dialect(),
                }
            })?;
            info!(
                "Resolved primary key '{}' for table '{}' ({}); retrying fetch",
                resolved,
                table,
                endpoint.dialect()
            );
            let values = endpoint.fetch_key_column(table, &resolved).await?;
            let keys = collect_keys(table, &resolved, values);
            Ok(KeySet {
                column: resolved,
                keys,
            })
        }
        Err(err) => Err(err),
    }
}

/// Collect fetched values into an ordered set, skipping values that cannot
/// serve as keys (NULLs, floats). Duplicates collapse.
fn collect_keys(table: &str, column: &str, values: Vec<SqlValue>) -> BTreeSet<KeyValue> {
    let total = values.len();
    let mut keys = BTreeSet::new();
    let mut skipped = 0usize;
    for value in &values {
        match KeyValue::from_sql(value) {
            Some(key) => {
                keys.insert(key);
            }
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(
            "{}.{}: skipped {} value(s) unusable as keys (NULL or float)",
            table, column, skipped
        );
    }
    debug!(
        "{}.{}: {} distinct key(s) from {} row(s)",
        table,
        column,
        keys.len(),
        total
    );
    keys
}
