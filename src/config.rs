use crate::db::StoreKind;
use crate::error::Result;
use crate::operations::summary::ViewMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_ENV: &str = "CASHTRACK_CONFIG";
const APP_DIR: &str = "cash-tracker";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreKind,
    /// Falls back to [`StoreKind::default_file_name`] when unset.
    pub data_file: Option<PathBuf>,
    pub default_mode: ViewMode,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreKind::Json,
            data_file: None,
            default_mode: ViewMode::Weekly,
            poll_interval_ms: 250,
        }
    }
}

impl Config {
    /// `$CASHTRACK_CONFIG` if set, otherwise the per-user config directory.
    pub fn default_path() -> Option<PathBuf> {
        match env::var_os(CONFIG_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE)),
        }
    }

    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Applies command-line overrides on top of the file values.
    pub fn with_overrides(mut self, store: Option<StoreKind>, data_file: Option<PathBuf>) -> Self {
        if let Some(store) = store {
            self.store = store;
        }
        if data_file.is_some() {
            self.data_file = data_file;
        }
        self
    }

    /// The data file to open for the configured store.
    pub fn data_path(&self) -> PathBuf {
        self.data_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.store.default_file_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"store":"sqlite","default_mode":"monthly"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.default_mode, ViewMode::Monthly);
        assert_eq!(config.data_file, None);
        assert_eq!(config.data_path(), PathBuf::from("data_cash.db"));
        assert_eq!(config.poll_interval_ms, 250);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = Config::default().with_overrides(Some(StoreKind::Sqlite), Some(PathBuf::from("x.db")));
        assert_eq!(config.store, StoreKind::Sqlite);
        assert_eq!(config.data_path(), PathBuf::from("x.db"));

        let untouched = Config::default().with_overrides(None, None);
        assert_eq!(untouched, Config::default());
    }

    #[test]
    fn test_default_data_file_follows_store() {
        assert_eq!(Config::default().data_path(), PathBuf::from("data_cash.json"));

        let sqlite = Config::default().with_overrides(Some(StoreKind::Sqlite), None);
        assert_eq!(sqlite.data_path(), PathBuf::from("data_cash.db"));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"store":"json","data_file":"ledger.json"}"#).unwrap();
        let explicit = Config::load_from(&path).unwrap().with_overrides(Some(StoreKind::Sqlite), None);
        assert_eq!(explicit.data_path(), PathBuf::from("ledger.json"));
    }
}
