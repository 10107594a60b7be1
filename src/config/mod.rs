//! User configuration stored as `config.json` in the application data
//! directory.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::{
    core::DEFAULT_CATEGORY_TEMPLATE,
    errors::BudgetError,
    storage::json_backend::{tmp_path, write_atomic},
    utils::paths,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceConfig {
    #[serde(default)]
    pub retry_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub user_id: String,
    /// Currency code shown next to amounts in CLI output.
    pub currency: String,
    /// Category names a brand-new month starts with, besides the system pair.
    #[serde(default)]
    pub default_categories: Vec<String>,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: "default".into(),
            currency: "USD".into(),
            default_categories: DEFAULT_CATEGORY_TEMPLATE
                .iter()
                .map(|name| name.to_string())
                .collect(),
            persistence: PersistenceConfig::default(),
            data_root: None,
        }
    }
}

impl Config {
    /// Where month files live: `data_root` when set, otherwise the
    /// application data directory.
    pub fn months_dir(&self) -> PathBuf {
        match &self.data_root {
            Some(root) => paths::months_dir_in(root),
            None => paths::months_dir(),
        }
    }
}

pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, BudgetError> {
        Self::from_base(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, BudgetError> {
        Self::from_base(base)
    }

    fn from_base(base: PathBuf) -> Result<Self, BudgetError> {
        fs::create_dir_all(&base)?;
        Ok(Self {
            path: paths::config_file_in(&base),
        })
    }

    /// Reads the stored configuration, or the defaults when none is saved.
    pub fn load(&self) -> Result<Config, BudgetError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data)
            .map_err(|err| BudgetError::Config(format!("{}: {err}", self.path.display())))?;
        if config.user_id.trim().is_empty() {
            return Err(BudgetError::Config("user id must not be empty".into()));
        }
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<(), BudgetError> {
        let json = serde_json::to_string_pretty(config)?;
        let tmp = tmp_path(&self.path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
