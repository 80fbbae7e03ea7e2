//! CLI configuration
//!
//! Loads and saves `config.toml` in the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use coinsensus_proof::ProverConfig;
use coinsensus_storage::StorageConfig;
use coinsensus_sybil::EligibilityConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Deepest registry tree a config may ask for
pub const MAX_TREE_DEPTH: usize = 32;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoinsensusConfig {
    #[serde(default)]
    pub eligibility: EligibilityConfig,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub prover: ProverConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl CoinsensusConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Defaults with the database placed under `data_dir`
    pub fn for_data_dir(data_dir: &Path) -> Self {
        Self {
            storage: StorageConfig {
                path: data_dir.join("db").join("coinsensus.redb"),
            },
            ..Default::default()
        }
    }

    /// Relaxed rules and small circuits for local experiments
    pub fn testing(data_dir: &Path) -> Self {
        Self {
            eligibility: EligibilityConfig::testing(),
            prover: ProverConfig::testing(),
            ..Self::for_data_dir(data_dir)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.eligibility.participation_cap == 0 {
            return Err(ConfigError::Invalid(
                "Participation cap must be greater than 0".to_string(),
            ));
        }

        if self.eligibility.ledger_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "Ledger timeout must be greater than 0".to_string(),
            ));
        }

        if self.prover.max_depth == 0 || self.prover.max_depth > MAX_TREE_DEPTH {
            return Err(ConfigError::Invalid(format!(
                "Merkle depth must be between 1 and {}",
                MAX_TREE_DEPTH
            )));
        }

        match self.logging.format.as_str() {
            "text" | "json" => Ok(()),
            other => Err(ConfigError::Invalid(format!("Unknown log format: {}", other))),
        }
    }
}

/// Ledger data source for offline evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// JSON map of address to `{ account_age_days, balance, transaction_count }`
    pub profiles: Option<PathBuf>,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,

    /// Output format (text, json)
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "coinsensus", "coinsensus")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".coinsensus"))
}

/// Get default config file path
pub fn default_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Explicit `--config`, else the data directory's config if present, else defaults
pub fn resolve(config: Option<&Path>, data_dir: &Path) -> Result<CoinsensusConfig, ConfigError> {
    match config {
        Some(path) => CoinsensusConfig::load(path),
        None => {
            let path = default_config_path(data_dir);
            if path.exists() {
                CoinsensusConfig::load(&path)
            } else {
                Ok(CoinsensusConfig::for_data_dir(data_dir))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = CoinsensusConfig::default();
        assert_eq!(config.eligibility.participation_cap, 5);
        assert_eq!(config.logging.format, "text");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = CoinsensusConfig::testing(dir.path());
        config.save(&path).unwrap();

        let loaded = CoinsensusConfig::load(&path).unwrap();
        assert_eq!(loaded.prover.max_depth, config.prover.max_depth);
        assert_eq!(loaded.storage, config.storage);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[eligibility]\nparticipation_cap = 2\n").unwrap();

        let loaded = CoinsensusConfig::load(&path).unwrap();
        assert_eq!(loaded.eligibility.participation_cap, 2);
        assert_eq!(loaded.eligibility.cooldown_secs, 86_400);
    }

    #[test]
    fn test_missing_config() {
        let dir = tempdir().unwrap();
        let err = CoinsensusConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_invalid_values() {
        let mut config = CoinsensusConfig::default();
        config.eligibility.participation_cap = 0;
        assert!(config.validate().is_err());

        let mut config = CoinsensusConfig::default();
        config.eligibility.ledger_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = CoinsensusConfig::default();
        config.prover.max_depth = 33;
        assert!(config.validate().is_err());

        let mut config = CoinsensusConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_data_dir() {
        let dir = tempdir().unwrap();
        let config = resolve(None, dir.path()).unwrap();
        assert_eq!(config.storage.path, dir.path().join("db").join("coinsensus.redb"));
    }
}
