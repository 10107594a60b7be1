//! Budget categories, their optional subcategories, and the reserved names.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    common::{total, Identifiable, NamedEntity},
    expense::Expense,
};

pub const SAVINGS: &str = "Savings";
pub const CREDIT_CARD_PAYMENTS: &str = "Credit Card Payments";

/// Canonical names of the two system categories every month must carry.
pub const RESERVED_CATEGORY_NAMES: [&str; 2] = [SAVINGS, CREDIT_CARD_PAYMENTS];

/// Returns the canonical reserved name matching `name` case-insensitively.
pub fn reserved_name(name: &str) -> Option<&'static str> {
    let candidate = name.trim();
    RESERVED_CATEGORY_NAMES
        .into_iter()
        .find(|reserved| reserved.eq_ignore_ascii_case(candidate))
}

/// A named slice of a non-system category's budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub budgeted_amount: Decimal,
    #[serde(default)]
    pub expenses: Vec<Expense>,
}

impl SubCategory {
    pub fn new(name: impl Into<String>, budgeted_amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            budgeted_amount,
            expenses: Vec::new(),
        }
    }

    pub fn spent(&self) -> Decimal {
        total(&self.expenses)
    }
}

impl Identifiable for SubCategory {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for SubCategory {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub budgeted_amount: Decimal,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    #[serde(default)]
    pub subcategories: Vec<SubCategory>,
    #[serde(default)]
    pub is_system_category: bool,
}

impl BudgetCategory {
    /// Creates a user category with no expenses or subcategories.
    pub fn new(name: impl Into<String>, budgeted_amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            budgeted_amount,
            expenses: Vec::new(),
            subcategories: Vec::new(),
            is_system_category: false,
        }
    }

    /// Creates one of the reserved categories under its canonical name.
    pub fn system(name: &'static str, budgeted_amount: Decimal) -> Self {
        Self {
            is_system_category: true,
            ..Self::new(name, budgeted_amount)
        }
    }

    pub fn has_subcategories(&self) -> bool {
        !self.subcategories.is_empty()
    }

    /// Sum of the subcategory budgets, the derived budget of a parent category.
    pub fn subcategory_budget_total(&self) -> Decimal {
        self.subcategories
            .iter()
            .map(|sub| sub.budgeted_amount)
            .sum()
    }

    /// Effective budget: the subcategory sum when subcategories exist.
    pub fn effective_budget(&self) -> Decimal {
        if !self.is_system_category && self.has_subcategories() {
            self.subcategory_budget_total()
        } else {
            self.budgeted_amount
        }
    }

    /// Everything spent in the category, including its subcategories.
    pub fn spent(&self) -> Decimal {
        total(&self.expenses)
            + self
                .subcategories
                .iter()
                .map(SubCategory::spent)
                .sum::<Decimal>()
    }

    pub fn subcategory(&self, id: Uuid) -> Option<&SubCategory> {
        self.subcategories.iter().find(|sub| sub.id == id)
    }

    pub fn subcategory_mut(&mut self, id: Uuid) -> Option<&mut SubCategory> {
        self.subcategories.iter_mut().find(|sub| sub.id == id)
    }
}

impl Identifiable for BudgetCategory {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for BudgetCategory {
    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn reserved_name_matching_ignores_case_and_padding() {
        assert_eq!(reserved_name(" savings "), Some(SAVINGS));
        assert_eq!(reserved_name("CREDIT card payments"), Some(CREDIT_CARD_PAYMENTS));
        assert_eq!(reserved_name("Savings account"), None);
    }

    #[test]
    fn spent_includes_subcategory_expenses() {
        let mut category = BudgetCategory::new("Groceries", dec!(0));
        let mut produce = SubCategory::new("Produce", dec!(50));
        produce
            .expenses
            .push(Expense::new("Apples", dec!(12.5), Utc::now()));
        category.subcategories.push(produce);
        category
            .expenses
            .push(Expense::new("Legacy", dec!(2.5), Utc::now()));

        assert_eq!(category.spent(), dec!(15));
        assert_eq!(category.effective_budget(), dec!(50));
    }

    #[test]
    fn missing_lists_deserialize_as_empty() {
        let raw = r#"{"id":"6f1c2f0e-8d4a-4a55-9c8e-0e7f3b7c1a11","name":"Other"}"#;
        let category: BudgetCategory = serde_json::from_str(raw).unwrap();
        assert!(category.expenses.is_empty());
        assert!(category.subcategories.is_empty());
        assert!(!category.is_system_category);
        assert_eq!(category.budgeted_amount, Decimal::ZERO);
    }
}
