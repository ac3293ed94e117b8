//! In-memory endpoints for exercising the engines without live databases.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, SyncError};
use crate::keys::KeyEndpoint;
use crate::source::{Column, SourceReader};
use crate::target::TargetWriter;
use crate::typemap::ColumnMapping;
use crate::value::{KeyValue, Row, SqlValue};

/// Build a row from (column, value) pairs.
pub fn mkrow(fields: &[(&str, SqlValue)]) -> Row {
    let mut row = Row::new();
    for (name, value) in fields {
        row.push(*name, value.clone());
    }
    row
}

pub struct MemoryTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub primary_key: Option<String>,
}

impl MemoryTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| Column::new(*c, "varchar")).collect(),
            rows: Vec::new(),
            primary_key: None,
        }
    }

    pub fn with_primary_key(mut self, pk: &str) -> Self {
        self.primary_key = Some(pk.to_string());
        self
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

/// In-memory stand-in for the MySQL endpoint.
#[derive(Default)]
pub struct MemorySource {
    pub tables: HashMap<String, MemoryTable>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, name: &str, table: MemoryTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .get(name)
            .ok_or_else(|| SyncError::schema(name, "table not found"))
    }
}

#[async_trait]
impl KeyEndpoint for MemorySource {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    async fn resolve_primary_key(&self, table: &str) -> Result<Option<String>> {
        Ok(self.table(table)?.primary_key.clone())
    }

    async fn fetch_key_column(&self, table: &str, column: &str) -> Result<Vec<SqlValue>> {
        let t = self.table(table)?;
        if !t.has_column(column) {
            return Err(SyncError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
                dialect: "mysql",
            });
        }
        Ok(t.rows
            .iter()
            .map(|r| {
                r.get(column)
                    .cloned()
                    .unwrap_or(SqlValue::Null(crate::value::SqlNullType::Text))
            })
            .collect())
    }
}

#[async_trait]
impl SourceReader for MemorySource {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn reflect_table(&self, table: &str) -> Result<Vec<Column>> {
        Ok(self
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn fetch_chunk(&self, table: &str, offset: u64, limit: usize) -> Result<Vec<Row>> {
        let t = self.table(table)?;
        let start = (offset as usize).min(t.rows.len());
        let end = (start + limit).min(t.rows.len());
        Ok(t.rows[start..end].to_vec())
    }

    async fn fetch_rows_by_key(
        &self,
        table: &str,
        key_column: &str,
        key: &KeyValue,
    ) -> Result<Vec<Row>> {
        let t = self.table(table)?;
        if !t.has_column(key_column) {
            return Err(SyncError::ColumnNotFound {
                table: table.to_string(),
                column: key_column.to_string(),
                dialect: "mysql",
            });
        }
        let wanted = key.to_sql();
        Ok(t.rows
            .iter()
            .filter(|r| r.get(key_column) == Some(&wanted))
            .cloned()
            .collect())
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        Ok(self.table(table)?.rows.len() as i64)
    }
}

pub struct MemoryTargetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub primary_key: Option<String>,
}

/// In-memory stand-in for the PostgreSQL endpoint.
///
/// Individual inserts can be made to fail by registering a (column, value)
/// pair; batch inserts are all-or-nothing like the real transactional path.
#[derive(Default)]
pub struct MemoryTarget {
    pub tables: Mutex<HashMap<String, MemoryTargetTable>>,
    pub fail_inserts_for: Mutex<Vec<(String, SqlValue)>>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        {
            let mut tables = self.tables.lock().unwrap();
            tables.insert(
                name.to_string(),
                MemoryTargetTable {
                    columns: columns.iter().map(|c| c.to_string()).collect(),
                    rows,
                    primary_key: None,
                },
            );
        }
        self
    }

    /// Make every insert of a row where `column` equals `value` fail.
    pub fn fail_inserts_matching(self, column: &str, value: SqlValue) -> Self {
        self.fail_inserts_for
            .lock()
            .unwrap()
            .push((column.to_string(), value));
        self
    }

    pub fn rows_of(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    fn should_fail(&self, row: &Row) -> bool {
        self.fail_inserts_for
            .lock()
            .unwrap()
            .iter()
            .any(|(column, value)| row.get(column) == Some(value))
    }
}

#[async_trait]
impl KeyEndpoint for MemoryTarget {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    async fn resolve_primary_key(&self, table: &str) -> Result<Option<String>> {
        let tables = self.tables.lock().unwrap();
        let t = tables
            .get(table)
            .ok_or_else(|| SyncError::schema(table, "table not found"))?;
        if let Some(pk) = &t.primary_key {
            return Ok(Some(pk.clone()));
        }
        if t.columns.iter().any(|c| c == "sid") {
            return Ok(Some("sid".to_string()));
        }
        Ok(None)
    }

    async fn fetch_key_column(&self, table: &str, column: &str) -> Result<Vec<SqlValue>> {
        let tables = self.tables.lock().unwrap();
        let t = tables
            .get(table)
            .ok_or_else(|| SyncError::schema(table, "table not found"))?;
        if !t.columns.iter().any(|c| c == column) {
            return Err(SyncError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
                dialect: "postgres",
            });
        }
        Ok(t.rows
            .iter()
            .map(|r| {
                r.get(column)
                    .cloned()
                    .unwrap_or(SqlValue::Null(crate::value::SqlNullType::Text))
            })
            .collect())
    }
}

#[async_trait]
impl TargetWriter for MemoryTarget {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.tables.lock().unwrap().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, table: &str, columns: &[ColumnMapping]) -> Result<()> {
        if columns.is_empty() {
            return Err(SyncError::schema(table, "no columns to create"));
        }
        let mut tables = self.tables.lock().unwrap();
        tables.insert(
            table.to_string(),
            MemoryTargetTable {
                columns: columns.iter().map(|c| c.name.clone()).collect(),
                rows: Vec::new(),
                primary_key: None,
            },
        );
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<()> {
        self.tables.lock().unwrap().remove(table);
        Ok(())
    }

    async fn insert_row(&self, table: &str, row: &Row) -> Result<u64> {
        if row.is_empty() {
            return Ok(0);
        }
        if self.should_fail(row) {
            return Err(SyncError::transfer(table, "simulated insert failure"));
        }
        let mut tables = self.tables.lock().unwrap();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| SyncError::schema(table, "table not found"))?;
        t.rows.push(row.clone());
        Ok(1)
    }

    async fn insert_batch(&self, table: &str, rows: &[Row]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }
        // All-or-nothing, like the transactional path.
        if rows.iter().any(|r| self.should_fail(r)) {
            return Err(SyncError::transfer(table, "simulated batch failure"));
        }
        let mut tables = self.tables.lock().unwrap();
        let t = tables
            .get_mut(table)
            .ok_or_else(|| SyncError::schema(table, "table not found"))?;
        t.rows.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    async fn row_count(&self, table: &str) -> Result<i64> {
        Ok(self.rows_of(table).len() as i64)
    }
}
