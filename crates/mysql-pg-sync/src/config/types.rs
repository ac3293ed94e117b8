//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// Every operation receives an explicit `Config`; there are no
/// process-wide connection defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MySQL/MariaDB).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Sync behavior configuration.
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Source database (MySQL) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password (may be empty for trust-authenticated local setups).
    #[serde(default)]
    pub password: String,
}

/// Target database (PostgreSQL) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password (may be empty for trust-authenticated local setups).
    #[serde(default)]
    pub password: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,
}

/// Sync behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// First-choice key column for reconciliation (default: "id").
    #[serde(default = "default_key_column")]
    pub key_column: String,

    /// Rows per transfer chunk (default: 10000).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Connections per endpoint pool (default: 4).
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            key_column: default_key_column(),
            chunk_size: default_chunk_size(),
            pool_size: default_pool_size(),
        }
    }
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_key_column() -> String {
    "id".to_string()
}

fn default_chunk_size() -> usize {
    10_000
}

fn default_pool_size() -> usize {
    4
}
