//! Type mapping between MySQL and PostgreSQL.
//!
//! The one rule that matters for correctness: MySQL's large-text types
//! (TINYTEXT/TEXT/MEDIUMTEXT/LONGTEXT) have no sized equivalent on the
//! target and all map to unbounded `text`. Everything else maps to the
//! closest PostgreSQL type; nothing is ever narrowed numerically.

use crate::source::Column;

/// Result of mapping a type from source to target.
#[derive(Debug, Clone)]
pub struct TypeMapping {
    /// Target type string (e.g. "varchar(255)", "bigint").
    pub target_type: String,
    /// Whether this mapping loses information.
    pub is_lossy: bool,
    /// Warning message for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Result of mapping a column from source to target.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    /// Target column name (same as source).
    pub name: String,
    /// Target data type string.
    pub target_type: String,
    /// Whether the column is nullable.
    pub is_nullable: bool,
    /// Warning message if the mapping is lossy.
    pub warning: Option<String>,
}

/// Map a reflected source column to its target definition.
pub fn map_column(col: &Column) -> ColumnMapping {
    let mapping = mysql_to_postgres(&col.data_type, col.max_length, col.precision, col.scale);
    ColumnMapping {
        name: col.name.clone(),
        target_type: mapping.target_type,
        is_nullable: col.is_nullable,
        warning: mapping.warning,
    }
}

/// Map a MySQL data type to PostgreSQL.
pub fn mysql_to_postgres(
    mysql_type: &str,
    max_length: i32,
    precision: i32,
    scale: i32,
) -> TypeMapping {
    match mysql_type.to_lowercase().as_str() {
        // Boolean (MySQL uses TINYINT(1) for bool)
        "tinyint" if max_length == 1 => TypeMapping::lossless("boolean"),
        "bool" | "boolean" => TypeMapping::lossless("boolean"),

        // Integer types
        "tinyint" => TypeMapping::lossless("smallint"),
        "smallint" => TypeMapping::lossless("smallint"),
        "mediumint" => TypeMapping::lossless("integer"),
        "int" | "integer" => TypeMapping::lossless("integer"),
        "bigint" => TypeMapping::lossless("bigint"),

        // Decimal/numeric
        "decimal" | "numeric" | "dec" | "fixed" => {
            if precision > 0 {
                TypeMapping::lossless(format!("numeric({},{})", precision, scale))
            } else {
                TypeMapping::lossless("numeric")
            }
        }

        // Floating point
        "float" => TypeMapping::lossless("real"),
        "double" | "double precision" | "real" => TypeMapping::lossless("double precision"),

        // String types
        "char" => {
            if max_length > 0 && max_length <= 10485760 {
                TypeMapping::lossless(format!("char({})", max_length))
            } else {
                TypeMapping::lossless("text")
            }
        }
        "varchar" => {
            if max_length > 0 && max_length <= 10485760 {
                TypeMapping::lossless(format!("varchar({})", max_length))
            } else {
                TypeMapping::lossless("text")
            }
        }

        // Large text types have no sized target equivalent
        "tinytext" | "text" | "mediumtext" | "longtext" => TypeMapping::lossless("text"),

        // Binary types
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
            TypeMapping::lossless("bytea")
        }

        // Date/time types
        "date" => TypeMapping::lossless("date"),
        "time" => TypeMapping::lossless("time"),
        "datetime" | "timestamp" => TypeMapping::lossless("timestamp"),
        "year" => TypeMapping::lossless("smallint"),

        // JSON
        "json" => TypeMapping::lossless("jsonb"),

        // Enum/set are stored as text
        "enum" => TypeMapping::lossy(
            "text",
            "MySQL ENUM stored as text; consider a CHECK constraint or PostgreSQL ENUM.",
        ),
        "set" => TypeMapping::lossy(
            "text",
            "MySQL SET stored as text; consider an array type or a separate table.",
        ),

        // Bit
        "bit" => {
            if max_length == 1 {
                TypeMapping::lossless("boolean")
            } else if max_length <= 64 {
                TypeMapping::lossless("bit varying")
            } else {
                TypeMapping::lossless("bytea")
            }
        }

        // Spatial types
        "geometry" | "point" | "linestring" | "polygon" | "multipoint" | "multilinestring"
        | "multipolygon" | "geometrycollection" => TypeMapping::lossy(
            "text",
            format!(
                "MySQL spatial type '{}' stored as text; consider PostGIS.",
                mysql_type
            ),
        ),

        // Default fallback
        _ => TypeMapping::lossy(
            "text",
            format!("Unknown MySQL type '{}' stored as text.", mysql_type),
        ),
    }
}
