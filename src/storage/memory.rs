use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use crate::{
    domain::{BudgetMonth, MonthId},
    errors::{BudgetError, Result},
};

use super::MonthStorage;

type UserMonths = BTreeMap<String, BTreeMap<MonthId, BudgetMonth>>;

/// Process-local storage. Clones share the same records, so a caller can keep
/// a handle for inspection after giving one to a `MonthManager`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<UserMonths>>,
    saves: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a month directly, bypassing the save counter.
    pub fn insert(&self, user_id: &str, month: BudgetMonth) {
        self.lock()
            .entry(user_id.to_string())
            .or_default()
            .insert(month.id, month);
    }

    pub fn month(&self, user_id: &str, month_id: MonthId) -> Option<BudgetMonth> {
        self.lock()
            .get(user_id)
            .and_then(|months| months.get(&month_id))
            .cloned()
    }

    /// Number of successful `save_month` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Makes subsequent saves fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, UserMonths> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MonthStorage for MemoryStorage {
    fn load_all_months(&self, user_id: &str) -> Result<BTreeMap<MonthId, BudgetMonth>> {
        Ok(self.lock().get(user_id).cloned().unwrap_or_default())
    }

    fn save_month(&self, user_id: &str, month_id: MonthId, month: &BudgetMonth) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BudgetError::Persistence(format!(
                "write of {month_id} rejected"
            )));
        }
        self.lock()
            .entry(user_id.to_string())
            .or_default()
            .insert(month_id, month.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
