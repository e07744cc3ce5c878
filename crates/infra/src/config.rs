//! Configuration loading and representation.

use std::path::PathBuf;

use comptrack_inventory::StockThreshold;

use crate::error::ConfigError;

pub const DATA_DIR_VAR: &str = "COMPTRACK_DATA_DIR";
pub const STOCK_THRESHOLD_VAR: &str = "COMPTRACK_STOCK_THRESHOLD";

/// Where the three backing files live and how stock status is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub inventory_file: String,
    pub audit_file: String,
    pub credentials_file: String,
    pub stock_threshold: StockThreshold,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            inventory_file: "inventory.csv".to_string(),
            audit_file: "logs.csv".to_string(),
            credentials_file: "users.csv".to_string(),
            stock_threshold: StockThreshold::DEFAULT,
        }
    }
}

impl StoreConfig {
    /// Defaults rooted at `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Read `COMPTRACK_DATA_DIR` / `COMPTRACK_STOCK_THRESHOLD`, falling back
    /// to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(DATA_DIR_VAR) {
            if dir.trim().is_empty() {
                return Err(ConfigError::EmptyPath { var: DATA_DIR_VAR });
            }
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(raw) = lookup(STOCK_THRESHOLD_VAR) {
            let value = raw
                .trim()
                .parse::<u32>()
                .map_err(|_| ConfigError::InvalidThreshold {
                    var: STOCK_THRESHOLD_VAR,
                    value: raw.clone(),
                })?;
            config.stock_threshold = StockThreshold::new(value);
        }

        tracing::debug!(
            data_dir = %config.data_dir.display(),
            stock_threshold = %config.stock_threshold,
            "store configuration resolved"
        );
        Ok(config)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.data_dir.join(&self.inventory_file)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.data_dir.join(&self.audit_file)
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join(&self.credentials_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_legacy_file_names() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.inventory_path(), PathBuf::from("./inventory.csv"));
        assert_eq!(config.audit_path(), PathBuf::from("./logs.csv"));
        assert_eq!(config.credentials_path(), PathBuf::from("./users.csv"));
        assert_eq!(config.stock_threshold, StockThreshold::new(5));
    }

    #[test]
    fn env_overrides_dir_and_threshold() {
        let config = StoreConfig::from_lookup(lookup(&[
            (DATA_DIR_VAR, "/var/lib/comptrack"),
            (STOCK_THRESHOLD_VAR, " 12 "),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/comptrack"));
        assert_eq!(config.stock_threshold, StockThreshold::new(12));
        assert_eq!(
            config.inventory_path(),
            PathBuf::from("/var/lib/comptrack/inventory.csv")
        );
    }

    #[test]
    fn bad_values_are_rejected() {
        let err = StoreConfig::from_lookup(lookup(&[(STOCK_THRESHOLD_VAR, "-1")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidThreshold {
                var: STOCK_THRESHOLD_VAR,
                value: "-1".to_string()
            }
        );

        let err = StoreConfig::from_lookup(lookup(&[(DATA_DIR_VAR, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyPath { var: DATA_DIR_VAR });
    }
}
