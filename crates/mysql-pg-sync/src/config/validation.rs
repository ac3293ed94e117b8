//! Configuration validation.

use super::Config;
use crate::error::{Result, SyncError};

/// Validate a parsed configuration.
pub fn validate(config: &Config) -> Result<()> {
    require(&config.source.host, "source.host")?;
    require(&config.source.database, "source.database")?;
    require(&config.source.user, "source.user")?;

    require(&config.target.host, "target.host")?;
    require(&config.target.database, "target.database")?;
    require(&config.target.user, "target.user")?;
    require(&config.target.schema, "target.schema")?;

    if config.sync.chunk_size == 0 {
        return Err(SyncError::Config("sync.chunk_size must be positive".into()));
    }
    if config.sync.pool_size == 0 {
        return Err(SyncError::Config("sync.pool_size must be positive".into()));
    }
    if config.sync.key_column.is_empty() {
        return Err(SyncError::Config("sync.key_column must not be empty".into()));
    }

    Ok(())
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.is_empty() {
        Err(SyncError::Config(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}
