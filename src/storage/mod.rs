pub mod json_backend;
pub mod memory;

use std::collections::BTreeMap;

use crate::{
    domain::{BudgetMonth, MonthId},
    errors::Result,
};

/// Persistence collaborator for a user's months, keyed by `YYYY-MM`.
pub trait MonthStorage: Send + Sync {
    fn load_all_months(&self, user_id: &str) -> Result<BTreeMap<MonthId, BudgetMonth>>;
    fn save_month(&self, user_id: &str, month_id: MonthId, month: &BudgetMonth) -> Result<()>;
}

pub use json_backend::JsonMonthStorage;
pub use memory::MemoryStorage;
