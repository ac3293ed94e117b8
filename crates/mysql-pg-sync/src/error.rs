//! Error types for migration and reconciliation operations.

use thiserror::Error;

/// Process exit code for configuration errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit code for source (MySQL) driver errors.
pub const EXIT_SOURCE_ERROR: u8 = 2;
/// Process exit code for target (PostgreSQL) driver errors.
pub const EXIT_TARGET_ERROR: u8 = 3;
/// Process exit code for connection pool errors.
pub const EXIT_POOL_ERROR: u8 = 4;
/// Process exit code when no usable key column can be determined.
pub const EXIT_KEY_ERROR: u8 = 5;
/// Process exit code for schema reflection/creation errors.
pub const EXIT_SCHEMA_ERROR: u8 = 6;
/// Process exit code for IO errors.
pub const EXIT_IO_ERROR: u8 = 7;
/// Process exit code for data transfer errors.
pub const EXIT_TRANSFER_ERROR: u8 = 8;

/// Main error type for sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A referenced column does not exist on the table.
    ///
    /// Raised by the endpoint adapters, which classify raw driver errors
    /// (MySQL SQLSTATE 42S22, PostgreSQL SQLSTATE 42703) exactly once so
    /// callers never pattern-match free-text messages.
    #[error("Column '{column}' not found on table '{table}' ({dialect})")]
    ColumnNotFound {
        table: String,
        column: String,
        dialect: &'static str,
    },

    /// Table or column reflection/creation failed
    #[error("Schema error for table {table}: {message}")]
    Schema { table: String, message: String },

    /// Neither catalog metadata nor the `sid` heuristic yielded a key column
    #[error("No usable key column for table '{table}' on {dialect}")]
    KeyResolution {
        table: String,
        dialect: &'static str,
    },

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// A zero-field row reached the row codec
    #[error("Row has no fields")]
    EmptyRow,

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        SyncError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Schema error
    pub fn schema(table: impl Into<String>, message: impl ToString) -> Self {
        SyncError::Schema {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl ToString) -> Self {
        SyncError::Transfer {
            table: table.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is the typed missing-column classification.
    pub fn is_column_not_found(&self) -> bool {
        matches!(self, SyncError::ColumnNotFound { .. })
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            SyncError::Config(_) | SyncError::Yaml(_) | SyncError::Json(_) => EXIT_CONFIG_ERROR,
            SyncError::Source(_) => EXIT_SOURCE_ERROR,
            SyncError::Target(_) => EXIT_TARGET_ERROR,
            SyncError::Pool { .. } => EXIT_POOL_ERROR,
            SyncError::ColumnNotFound { .. } | SyncError::KeyResolution { .. } => EXIT_KEY_ERROR,
            SyncError::Schema { .. } => EXIT_SCHEMA_ERROR,
            SyncError::Io(_) => EXIT_IO_ERROR,
            SyncError::Transfer { .. } | SyncError::EmptyRow => EXIT_TRANSFER_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SyncError::Config("bad".into()).exit_code(), EXIT_CONFIG_ERROR);
        assert_eq!(
            SyncError::KeyResolution {
                table: "t".into(),
                dialect: "postgres",
            }
            .exit_code(),
            EXIT_KEY_ERROR
        );
        assert_eq!(
            SyncError::schema("t", "no columns").exit_code(),
            EXIT_SCHEMA_ERROR
        );
        assert_eq!(
            SyncError::transfer("t", "insert failed").exit_code(),
            EXIT_TRANSFER_ERROR
        );
    }

    #[test]
    fn test_column_not_found_classification() {
        let err = SyncError::ColumnNotFound {
            table: "webform_submission_data".into(),
            column: "id".into(),
            dialect: "mysql",
        };
        assert!(err.is_column_not_found());
        assert!(!SyncError::EmptyRow.is_column_not_found());
    }

    #[test]
    fn test_format_detailed_includes_message() {
        let err = SyncError::transfer("t", "chunk 3 failed");
        let detail = err.format_detailed();
        assert!(detail.contains("Transfer failed for table t"));
        assert!(detail.contains("chunk 3 failed"));
    }
}
