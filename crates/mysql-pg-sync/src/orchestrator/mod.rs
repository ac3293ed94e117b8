//! Operation entry points: migrate, count comparison, reconciliation.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::reconcile::{self, ReconcileReport};
use crate::source::{MysqlEndpoint, SourceReader};
use crate::target::{PgEndpoint, TargetWriter};
use crate::transfer::{self, TransferStats};
use crate::typemap;

/// Summary of one table migration.
#[derive(Debug, Clone, Serialize)]
pub struct MigrateSummary {
    /// Migrated table.
    pub table: String,

    /// Number of columns created on the target.
    pub columns: usize,

    /// Whether a pre-existing target table was dropped first.
    pub dropped_existing: bool,

    /// Transfer statistics.
    pub stats: TransferStats,
}

/// Summary of a whole-database migration.
#[derive(Debug, Clone, Serialize, Default)]
pub struct MigrateAllSummary {
    /// Per-table summaries for tables that migrated successfully.
    pub migrated: Vec<MigrateSummary>,

    /// Tables that failed, with the error message.
    pub failed: Vec<FailedTable>,
}

/// A table that failed to migrate.
#[derive(Debug, Clone, Serialize)]
pub struct FailedTable {
    pub table: String,
    pub error: String,
}

/// Row counts for one table on both endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CountComparison {
    pub table: String,
    pub source_rows: i64,
    pub target_rows: i64,
    /// `source_rows - target_rows`; positive means the target is behind.
    pub difference: i64,
}

impl CountComparison {
    /// Whether both sides hold the same number of rows.
    #[must_use]
    pub fn matches(&self) -> bool {
        self.difference == 0
    }
}

/// Row counts across the union of all tables on both endpoints.
#[derive(Debug, Clone, Serialize, Default)]
pub struct TableCountReport {
    pub entries: Vec<TableCountEntry>,
}

/// One table's counts; `None` means the table is absent on that side or
/// its count failed (the failure is logged).
#[derive(Debug, Clone, Serialize)]
pub struct TableCountEntry {
    pub table: String,
    pub source_rows: Option<i64>,
    pub target_rows: Option<i64>,
}

/// Reflect a source table, coerce its types, (re)create it on the target
/// and transfer all rows.
pub async fn migrate<S, T>(
    source: &S,
    target: &T,
    table: &str,
    drop_existing: bool,
    chunk_size: usize,
) -> Result<MigrateSummary>
where
    S: SourceReader + ?Sized,
    T: TargetWriter + ?Sized,
{
    info!("Reflecting schema for table '{}'", table);
    let columns = source.reflect_table(table).await?;
    if columns.is_empty() {
        return Err(SyncError::schema(
            table,
            "table not found in source or has no columns",
        ));
    }

    let mapped: Vec<_> = columns.iter().map(typemap::map_column).collect();
    for m in &mapped {
        if let Some(warning) = &m.warning {
            warn!("{}.{}: {}", table, m.name, warning);
        }
    }

    if drop_existing {
        info!("Dropping target table '{}' if it exists", table);
        target.drop_table(table).await?;
    }

    // A failed creation aborts the whole migrate; no partial schema.
    target.create_table(table, &mapped).await?;

    let stats = transfer::transfer(source, target, table, chunk_size).await?;

    Ok(MigrateSummary {
        table: table.to_string(),
        columns: mapped.len(),
        dropped_existing: drop_existing,
        stats,
    })
}

/// Migrate every base table in the source database; per-table failures are
/// reported and skipped.
pub async fn migrate_all<S, T>(
    source: &S,
    target: &T,
    drop_existing: bool,
    chunk_size: usize,
) -> Result<MigrateAllSummary>
where
    S: SourceReader + ?Sized,
    T: TargetWriter + ?Sized,
{
    let tables = source.list_tables().await?;
    info!("Found {} table(s) in source database", tables.len());

    let mut summary = MigrateAllSummary::default();
    for table in &tables {
        match migrate(source, target, table, drop_existing, chunk_size).await {
            Ok(s) => summary.migrated.push(s),
            Err(e) => {
                error!("Migration failed for table '{}': {}", table, e);
                summary.failed.push(FailedTable {
                    table: table.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    Ok(summary)
}

/// Compare row counts for one table on both endpoints.
pub async fn compare_counts<S, T>(source: &S, target: &T, table: &str) -> Result<CountComparison>
where
    S: SourceReader + ?Sized,
    T: TargetWriter + ?Sized,
{
    let source_rows = source.row_count(table).await?;
    let target_rows = TargetWriter::row_count(target, table).await?;

    Ok(CountComparison {
        table: table.to_string(),
        source_rows,
        target_rows,
        difference: source_rows - target_rows,
    })
}

/// Compare row counts for the union of all tables on both endpoints.
pub async fn compare_all_tables<S, T>(source: &S, target: &T) -> Result<TableCountReport>
where
    S: SourceReader + ?Sized,
    T: TargetWriter + ?Sized,
{
    let source_tables: BTreeSet<String> = source.list_tables().await?.into_iter().collect();
    let target_tables: BTreeSet<String> = target.list_tables().await?.into_iter().collect();

    let mut report = TableCountReport::default();
    for table in source_tables.union(&target_tables) {
        let source_rows = if source_tables.contains(table) {
            count_or_none(source.row_count(table).await, table, "source")
        } else {
            None
        };
        let target_rows = if target_tables.contains(table) {
            count_or_none(TargetWriter::row_count(target, table).await, table, "target")
        } else {
            None
        };
        report.entries.push(TableCountEntry {
            table: table.clone(),
            source_rows,
            target_rows,
        });
    }
    Ok(report)
}

fn count_or_none(result: Result<i64>, table: &str, side: &str) -> Option<i64> {
    match result {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("Count failed for {} table '{}': {}", side, table, e);
            None
        }
    }
}

/// Connected pair of endpoints plus configuration.
pub struct Orchestrator {
    config: Config,
    source: MysqlEndpoint,
    target: PgEndpoint,
}

impl Orchestrator {
    /// Connect both endpoints, verifying each with a probe query.
    pub async fn connect(config: Config) -> Result<Self> {
        let source =
            MysqlEndpoint::connect(&config.source, config.sync.pool_size as u32).await?;
        let target = PgEndpoint::connect(&config.target, config.sync.pool_size).await?;
        Ok(Self {
            config,
            source,
            target,
        })
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Migrate one table (see [`migrate`]).
    pub async fn migrate_table(
        &self,
        table: &str,
        drop_existing: bool,
        chunk_size: Option<usize>,
    ) -> Result<MigrateSummary> {
        let chunk_size = chunk_size.unwrap_or(self.config.sync.chunk_size);
        migrate(&self.source, &self.target, table, drop_existing, chunk_size).await
    }

    /// Migrate every source table (see [`migrate_all`]).
    pub async fn migrate_all_tables(
        &self,
        drop_existing: bool,
        chunk_size: Option<usize>,
    ) -> Result<MigrateAllSummary> {
        let chunk_size = chunk_size.unwrap_or(self.config.sync.chunk_size);
        migrate_all(&self.source, &self.target, drop_existing, chunk_size).await
    }

    /// Compare row counts for one table.
    pub async fn compare_counts(&self, table: &str) -> Result<CountComparison> {
        compare_counts(&self.source, &self.target, table).await
    }

    /// Compare row counts across all tables.
    pub async fn compare_all_tables(&self) -> Result<TableCountReport> {
        compare_all_tables(&self.source, &self.target).await
    }

    /// Reconcile one table, adding rows missing from the target.
    pub async fn reconcile_table(
        &self,
        table: &str,
        key_column: Option<&str>,
    ) -> Result<ReconcileReport> {
        let key_column = key_column.unwrap_or(&self.config.sync.key_column);
        reconcile::reconcile(&self.source, &self.target, table, key_column).await
    }
}
