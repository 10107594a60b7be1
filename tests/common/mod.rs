#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use budget_months::{
    core::MonthManager,
    domain::{BudgetCategory, BudgetMonth, MonthId},
    storage::{JsonMonthStorage, MemoryStorage},
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

pub const USER: &str = "tester";

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

/// Manager backed by shared in-memory storage; the returned handle observes writes.
pub fn memory_manager() -> (MonthManager, MemoryStorage) {
    let storage = MemoryStorage::new();
    let manager = MonthManager::new(USER, Box::new(storage.clone()));
    (manager, storage)
}

/// Manager backed by JSON files in a fresh directory.
pub fn json_manager() -> (MonthManager, PathBuf) {
    let root = temp_dir();
    (json_manager_at(&root), root)
}

pub fn json_manager_at(root: &PathBuf) -> MonthManager {
    let storage = JsonMonthStorage::new(Some(root.clone())).expect("create json storage");
    MonthManager::new(USER, Box::new(storage))
}

pub fn month_id(value: &str) -> MonthId {
    value.parse().expect("valid month id")
}

pub fn named<'a>(month: &'a BudgetMonth, name: &str) -> &'a BudgetCategory {
    month
        .categories
        .iter()
        .find(|category| category.name == name)
        .unwrap_or_else(|| panic!("category {name} missing"))
}

/// Asserts the reserved pair is present exactly once, flagged and flat.
pub fn assert_system_invariant(month: &BudgetMonth) {
    for name in ["Savings", "Credit Card Payments"] {
        let matches: Vec<_> = month
            .categories
            .iter()
            .filter(|category| category.name == name)
            .collect();
        assert_eq!(matches.len(), 1, "{name} present once in {}", month.id);
        assert!(matches[0].is_system_category);
        assert!(matches[0].subcategories.is_empty());
    }
}

/// Asserts every user category with subcategories budgets their sum.
pub fn assert_budget_sums(month: &BudgetMonth) {
    for category in month.categories.iter().filter(|c| !c.is_system_category) {
        if !category.subcategories.is_empty() {
            let sum: rust_decimal::Decimal = category
                .subcategories
                .iter()
                .map(|sub| sub.budgeted_amount)
                .sum();
            assert_eq!(category.budgeted_amount, sum, "{}", category.name);
        }
    }
}
