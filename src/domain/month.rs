//! The per-month aggregate root.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    category::{BudgetCategory, CREDIT_CARD_PAYMENTS, SAVINGS},
    common::MonthId,
    expense::IncomeEntry,
};

/// Budget data for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetMonth {
    pub id: MonthId,
    pub year: i32,
    pub month: u32,
    #[serde(default)]
    pub incomes: Vec<IncomeEntry>,
    #[serde(default)]
    pub categories: Vec<BudgetCategory>,
    #[serde(default)]
    pub starting_credit_card_debt: Decimal,
    #[serde(default)]
    pub is_rolled_over: bool,
}

impl BudgetMonth {
    /// Creates an open month with no incomes, categories or debt.
    pub fn empty(id: MonthId) -> Self {
        Self {
            id,
            year: id.year(),
            month: id.month(),
            incomes: Vec::new(),
            categories: Vec::new(),
            starting_credit_card_debt: Decimal::ZERO,
            is_rolled_over: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.is_rolled_over
    }

    pub fn category(&self, id: Uuid) -> Option<&BudgetCategory> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn category_mut(&mut self, id: Uuid) -> Option<&mut BudgetCategory> {
        self.categories.iter_mut().find(|category| category.id == id)
    }

    /// Looks up a system category by its canonical name.
    pub fn system_category(&self, name: &str) -> Option<&BudgetCategory> {
        self.categories
            .iter()
            .find(|category| category.is_system_category && category.name == name)
    }

    pub fn savings(&self) -> Option<&BudgetCategory> {
        self.system_category(SAVINGS)
    }

    pub fn credit_card_payments(&self) -> Option<&BudgetCategory> {
        self.system_category(CREDIT_CARD_PAYMENTS)
    }

    /// Finds the parent category owning the given subcategory.
    pub fn parent_of_subcategory_mut(&mut self, sub_id: Uuid) -> Option<&mut BudgetCategory> {
        self.categories
            .iter_mut()
            .find(|category| category.subcategory(sub_id).is_some())
    }
}
