//! Schema metadata types produced by reflection.

use serde::{Deserialize, Serialize};

/// Column metadata reflected from the source catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared data type (lowercased catalog name, e.g. "mediumtext").
    pub data_type: String,

    /// Maximum character length, 0 when not applicable, -1 for unbounded.
    pub max_length: i32,

    /// Numeric precision, 0 when not applicable.
    pub precision: i32,

    /// Numeric scale, 0 when not applicable.
    pub scale: i32,

    /// Whether the column accepts NULL.
    pub is_nullable: bool,

    /// 1-based position within the table.
    pub ordinal_pos: i32,
}

impl Column {
    /// Shorthand for building a column in tests and fixtures.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_nullable: true,
            ordinal_pos: 0,
        }
    }
}
