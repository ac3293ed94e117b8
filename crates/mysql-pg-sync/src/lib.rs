//! # mysql-pg-sync
//!
//! MySQL to PostgreSQL table migration and one-directional reconciliation.
//!
//! This library moves table data between two live database connections:
//!
//! - **Migrate**: reflect a source table's schema, coerce MySQL-only types
//!   to supported PostgreSQL types, (re)create the table and stream all
//!   rows across in bounded chunks.
//! - **Reconcile**: diff key sets between the two sides and insert only
//!   the rows the target is missing, inferring the key column from
//!   catalog metadata when the nominal one does not exist.
//! - **Compare**: row-count comparison for one table or across the whole
//!   database.
//!
//! Values are sanitized in flight: PostgreSQL rejects NUL bytes inside
//! text fields that MySQL happily stores.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_pg_sync::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> mysql_pg_sync::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let orchestrator = Orchestrator::connect(config).await?;
//!     let report = orchestrator.reconcile_table("webform_submission_data", None).await?;
//!     println!("Inserted {} missing rows", report.inserted);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod keys;
pub mod orchestrator;
pub mod reconcile;
pub mod source;
pub mod target;
pub mod transfer;
pub mod typemap;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{Config, SourceConfig, SyncConfig, TargetConfig};
pub use error::{Result, SyncError};
pub use keys::{fetch_keys, KeyEndpoint, KeySet};
pub use orchestrator::{
    CountComparison, MigrateAllSummary, MigrateSummary, Orchestrator, TableCountReport,
};
pub use reconcile::ReconcileReport;
pub use source::{MysqlEndpoint, SourceReader};
pub use target::{PgEndpoint, TargetWriter};
pub use transfer::TransferStats;
pub use value::{KeyValue, Row, SqlValue};
