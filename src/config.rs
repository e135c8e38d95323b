use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::service::{DEFAULT_MAX_AUDIT_RETRIES, DEFAULT_MAX_CONFLICT_RETRIES};

/// Main configuration structure for Greenlight
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GreenlightConfig {
    /// Where the file-backed store keeps project records and audit logs
    pub storage: StorageConfig,
    /// Decision service settings
    pub engine: EngineConfig,
    /// Logging settings
    pub observability: ObservabilityConfig,
    /// Database settings (optional, used with the `database` feature)
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Re-derivation attempts after a version conflict before giving up
    pub max_conflict_retries: u32,
    /// Extra audit append attempts after a sink failure
    pub max_audit_retries: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level filter, overridden by RUST_LOG
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable output
    pub json_logs: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: false,
        }
    }
}

impl Default for GreenlightConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: ".greenlight".to_string(),
            },
            engine: EngineConfig {
                max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
                max_audit_retries: DEFAULT_MAX_AUDIT_RETRIES,
            },
            observability: ObservabilityConfig::default(),
            database: None,
        }
    }
}

impl GreenlightConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration file (greenlight.toml)
    /// 3. Environment variables (GREENLIGHT__SECTION__KEY)
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("greenlight.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = Config::try_from(&GreenlightConfig::default())
            .context("Failed to build default configuration")?;

        let mut builder = Config::builder().add_source(defaults);

        if path.exists() {
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("GREENLIGHT")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let greenlight_config: GreenlightConfig = config
            .try_deserialize()
            .context("Invalid greenlight configuration")?;

        Ok(greenlight_config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<GreenlightConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        // Load .env file first
        let _ = GreenlightConfig::load_env_file();
        GreenlightConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static GreenlightConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {:#}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_load_without_file() {
        let config = GreenlightConfig::load_from(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(config.engine.max_conflict_retries, DEFAULT_MAX_CONFLICT_RETRIES);
        assert_eq!(config.engine.max_audit_retries, DEFAULT_MAX_AUDIT_RETRIES);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greenlight.toml");
        std::fs::write(
            &path,
            "[storage]\ndata_dir = \"/srv/greenlight\"\n\n[engine]\nmax_conflict_retries = 7\n",
        )
        .unwrap();

        let config = GreenlightConfig::load_from(&path).unwrap();
        assert_eq!(config.storage.data_dir, "/srv/greenlight");
        assert_eq!(config.engine.max_conflict_retries, 7);
        assert_eq!(config.observability.log_level, "warn");
    }

    #[test]
    fn test_save_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("greenlight.toml");

        let mut config = GreenlightConfig::default();
        config.observability.json_logs = true;
        config.save_to_file(&path).unwrap();

        let loaded = GreenlightConfig::load_from(&path).unwrap();
        assert!(loaded.observability.json_logs);
    }
}
