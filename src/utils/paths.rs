use dirs::home_dir;
use std::{env, path::PathBuf};

pub const HOME_ENV: &str = "BUDGET_MONTHS_HOME";
const DEFAULT_DIR_NAME: &str = ".budget_months";
const MONTHS_DIR: &str = "months";
const CONFIG_FILE: &str = "config.json";

/// Returns the application data directory, defaulting to `~/.budget_months`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Directory holding one sub-directory of month files per user.
pub fn months_dir() -> PathBuf {
    months_dir_in(&app_data_dir())
}

pub fn months_dir_in(base: &std::path::Path) -> PathBuf {
    base.join(MONTHS_DIR)
}

pub fn config_file() -> PathBuf {
    config_file_in(&app_data_dir())
}

pub fn config_file_in(base: &std::path::Path) -> PathBuf {
    base.join(CONFIG_FILE)
}
