//! One-directional key reconciliation.
//!
//! Adds rows that exist on the source but not on the target, addressed by
//! key value. The target is authoritative for "already present": rows
//! present only on the target are never touched, and rows present on both
//! sides are never diffed or merged. A key column that is not actually
//! unique collapses duplicate key values during diffing; every source row
//! matching a missing key is migrated.

use serde::Serialize;
use tracing::{info, warn};

use crate::codec::sanitize_row;
use crate::error::Result;
use crate::keys::fetch_keys;
use crate::source::SourceReader;
use crate::target::TargetWriter;
use crate::value::KeyValue;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    /// Table that was reconciled.
    pub table: String,

    /// Nominal key column requested by the caller.
    pub key_column: String,

    /// Key column actually used on the source after negotiation.
    pub source_key_column: String,

    /// Distinct keys on the source.
    pub source_keys: usize,

    /// Distinct keys on the target.
    pub target_keys: usize,

    /// Keys present on the source but absent from the target.
    pub missing: usize,

    /// Rows successfully inserted into the target.
    pub inserted: u64,

    /// Rows whose insert failed and was skipped.
    pub failed: usize,
}

/// Insert into the target every source row whose key the target is missing.
///
/// Key sets are fetched on both endpoints with `key_column` as the
/// first-choice name; each side independently falls back to its resolved
/// primary key when the column does not exist. Missing keys are processed
/// in ascending order for reproducible runs. Individual insert failures
/// are logged and skipped; the report counts only successful inserts.
pub async fn reconcile<S, T>(
    source: &S,
    target: &T,
    table: &str,
    key_column: &str,
) -> Result<ReconcileReport>
where
    S: SourceReader + ?Sized,
    T: TargetWriter + ?Sized,
{
    let source_set = fetch_keys(source, table, key_column).await?;
    let target_set = fetch_keys(target, table, key_column).await?;

    info!(
        "{}: {} source key(s), {} target key(s)",
        table,
        source_set.len(),
        target_set.len()
    );

    let missing: Vec<&KeyValue> = source_set.keys.difference(&target_set.keys).collect();
    info!("{}: {} missing row key(s) in target", table, missing.len());

    let mut inserted = 0u64;
    let mut failed = 0usize;

    for key in &missing {
        // All matching rows migrate; a non-unique key means several.
        let rows = source
            .fetch_rows_by_key(table, &source_set.column, key)
            .await?;
        if rows.is_empty() {
            warn!("{}: no source rows found for key {}", table, key);
            continue;
        }

        for row in &rows {
            let clean = sanitize_row(row);
            if clean.is_empty() {
                continue;
            }
            match target.insert_row(table, &clean).await {
                Ok(n) => inserted += n,
                Err(e) => {
                    failed += 1;
                    warn!(
                        "{}: failed to insert row with key {}, skipping: {}",
                        table, key, e
                    );
                }
            }
        }
    }

    info!(
        "{}: inserted {} missing row(s), {} failed",
        table, inserted, failed
    );

    let source_keys = source_set.len();
    let target_keys = target_set.len();
    Ok(ReconcileReport {
        table: table.to_string(),
        key_column: key_column.to_string(),
        source_key_column: source_set.column,
        source_keys,
        target_keys,
        missing: missing.len(),
        inserted,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mkrow, MemorySource, MemoryTable, MemoryTarget};
    use crate::value::SqlValue;

    fn row(id: i64, name: &str) -> crate::value::Row {
        mkrow(&[
            ("id", SqlValue::Int(id)),
            ("name", SqlValue::Text(name.into())),
        ])
    }

    fn source_with(ids: &[(i64, &str)]) -> MemorySource {
        let rows = ids.iter().map(|(id, name)| row(*id, name)).collect();
        MemorySource::new()
            .with_table("t", MemoryTable::new(&["id", "name"]).with_rows(rows))
    }

    #[tokio::test]
    async fn test_inserts_only_missing_rows() {
        let source = source_with(&[(1, "one"), (2, "two"), (3, "three")]);
        let target = MemoryTarget::new().with_table(
            "t",
            &["id", "name"],
            vec![row(2, "two"), row(3, "three")],
        );

        let report = reconcile(&source, &target, "t", "id").await.unwrap();
        assert_eq!(report.missing, 1);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 0);

        let rows = target.rows_of("t");
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|r| r.get("id") == Some(&SqlValue::Int(1))));
    }

    #[tokio::test]
    async fn test_converged_pair_inserts_nothing() {
        let source = source_with(&[(1, "one"), (2, "two")]);
        let target = MemoryTarget::new().with_table(
            "t",
            &["id", "name"],
            vec![row(1, "one"), row(2, "two")],
        );

        let report = reconcile(&source, &target, "t", "id").await.unwrap();
        assert_eq!(report.missing, 0);
        assert_eq!(report.inserted, 0);
        assert_eq!(target.rows_of("t").len(), 2);
    }

    #[tokio::test]
    async fn test_second_run_after_reconcile_inserts_zero() {
        let source = source_with(&[(1, "one"), (2, "two"), (3, "three")]);
        let target = MemoryTarget::new().with_table("t", &["id", "name"], vec![row(2, "two")]);

        let first = reconcile(&source, &target, "t", "id").await.unwrap();
        assert_eq!(first.inserted, 2);

        let second = reconcile(&source, &target, "t", "id").await.unwrap();
        assert_eq!(second.missing, 0);
        assert_eq!(second.inserted, 0);
    }

    #[tokio::test]
    async fn test_non_unique_key_migrates_every_matching_row() {
        let source = source_with(&[(1, "first"), (1, "second"), (2, "two")]);
        let target = MemoryTarget::new().with_table("t", &["id", "name"], vec![row(2, "two")]);

        let report = reconcile(&source, &target, "t", "id").await.unwrap();
        // Key 1 collapses to one missing key but both rows migrate.
        assert_eq!(report.missing, 1);
        assert_eq!(report.inserted, 2);
        assert_eq!(target.rows_of("t").len(), 3);
    }

    #[tokio::test]
    async fn test_per_row_failure_is_skipped_not_fatal() {
        let source = source_with(&[(1, "one"), (2, "two"), (4, "four")]);
        let target = MemoryTarget::new()
            .with_table("t", &["id", "name"], vec![row(2, "two")])
            .fail_inserts_matching("id", SqlValue::Int(4));

        let report = reconcile(&source, &target, "t", "id").await.unwrap();
        assert_eq!(report.missing, 2);
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, 1);
        assert!(target
            .rows_of("t")
            .iter()
            .any(|r| r.get("id") == Some(&SqlValue::Int(1))));
    }

    #[tokio::test]
    async fn test_rows_sanitized_before_insert() {
        let rows = vec![mkrow(&[
            ("id", SqlValue::Int(1)),
            ("name", SqlValue::Text("a\0b".into())),
        ])];
        let source = MemorySource::new()
            .with_table("t", MemoryTable::new(&["id", "name"]).with_rows(rows));
        let target = MemoryTarget::new().with_table("t", &["id", "name"], Vec::new());

        reconcile(&source, &target, "t", "id").await.unwrap();
        let stored = target.rows_of("t");
        assert_eq!(stored[0].get("name"), Some(&SqlValue::Text("ab".into())));
    }

    #[tokio::test]
    async fn test_nominal_column_falls_back_per_side() {
        // Neither side has an "id" column; both resolve to "sid".
        let rows = vec![
            mkrow(&[("sid", SqlValue::Int(10)), ("name", SqlValue::Text("x".into()))]),
            mkrow(&[("sid", SqlValue::Int(11)), ("name", SqlValue::Text("y".into()))]),
        ];
        let source = MemorySource::new().with_table(
            "t",
            MemoryTable::new(&["sid", "name"])
                .with_rows(rows)
                .with_primary_key("sid"),
        );
        let target = MemoryTarget::new().with_table(
            "t",
            &["sid", "name"],
            vec![mkrow(&[
                ("sid", SqlValue::Int(10)),
                ("name", SqlValue::Text("x".into())),
            ])],
        );

        let report = reconcile(&source, &target, "t", "id").await.unwrap();
        assert_eq!(report.source_key_column, "sid");
        assert_eq!(report.inserted, 1);
        assert_eq!(target.rows_of("t").len(), 2);
    }
}
