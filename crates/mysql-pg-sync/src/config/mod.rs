//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use std::path::Path;

use crate::error::Result;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    const MINIMAL: &str = r#"
source:
  host: 127.0.0.1
  database: source_db
  user: root
  password: root
target:
  host: localhost
  database: hexly_proj
  user: postgres
"#;

    #[test]
    fn test_minimal_config_with_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.schema, "public");
        assert_eq!(config.target.password, "");
        assert_eq!(config.sync.key_column, "id");
        assert_eq!(config.sync.chunk_size, 10_000);
        assert_eq!(config.sync.pool_size, 4);
    }

    #[test]
    fn test_explicit_sync_section() {
        let yaml = format!(
            "{}\nsync:\n  key_column: sid\n  chunk_size: 500\n  pool_size: 2\n",
            MINIMAL
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.sync.key_column, "sid");
        assert_eq!(config.sync.chunk_size, 500);
        assert_eq!(config.sync.pool_size, 2);
    }

    #[test]
    fn test_missing_required_field_fails() {
        let yaml = r#"
source:
  host: 127.0.0.1
  database: source_db
  user: root
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let yaml = format!("{}\nsync:\n  chunk_size: 0\n", MINIMAL);
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }

    #[test]
    fn test_empty_host_rejected() {
        let yaml = MINIMAL.replace("host: 127.0.0.1", "host: \"\"");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
