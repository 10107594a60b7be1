use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    domain::{BudgetMonth, MonthId},
    errors::{BudgetError, Result},
    utils::paths,
};

use super::MonthStorage;

const MONTH_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";

/// Stores each month as a pretty-printed JSON file at
/// `<root>/<user>/<YYYY-MM>.json`.
#[derive(Debug, Clone)]
pub struct JsonMonthStorage {
    root: PathBuf,
}

impl JsonMonthStorage {
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(paths::months_dir);
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn new_default() -> Result<Self> {
        Self::new(None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, user_id: &str) -> PathBuf {
        self.root.join(canonical_name(user_id))
    }

    pub fn month_path(&self, user_id: &str, month_id: MonthId) -> PathBuf {
        self.user_dir(user_id)
            .join(format!("{}.{}", month_id, MONTH_EXTENSION))
    }
}

impl MonthStorage for JsonMonthStorage {
    fn load_all_months(&self, user_id: &str) -> Result<BTreeMap<MonthId, BudgetMonth>> {
        let dir = self.user_dir(user_id);
        let mut months = BTreeMap::new();
        if !dir.exists() {
            return Ok(months);
        }
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(MONTH_EXTENSION) {
                continue;
            }
            let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<MonthId>().ok())
            else {
                warn!(path = %path.display(), "skipping file without a month id name");
                continue;
            };
            let mut month = load_month_from_path(&path)?;
            if month.id != key {
                warn!(path = %path.display(), stored = %month.id, "month id differs from file name");
                month.id = key;
            }
            months.insert(key, month);
        }
        Ok(months)
    }

    fn save_month(&self, user_id: &str, month_id: MonthId, month: &BudgetMonth) -> Result<()> {
        let path = self.month_path(user_id, month_id);
        let json = serde_json::to_string_pretty(month)?;
        let tmp = tmp_path(&path);
        write_atomic(&tmp, &json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

pub fn load_month_from_path(path: &Path) -> Result<BudgetMonth> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| BudgetError::Persistence(format!("{}: {err}", path.display())))
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "default".into()
    } else {
        sanitized
    }
}

pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
