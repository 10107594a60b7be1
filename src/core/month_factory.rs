//! Builds brand-new months, carrying debt and planned savings forward from
//! the calendar predecessor.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use crate::domain::{
    category::reserved_name, common::total, BudgetCategory, BudgetMonth, MonthId, SAVINGS,
};

use super::normalizer::normalize_system_categories;

/// Categories every new month starts with, all budgeted at zero.
pub const DEFAULT_CATEGORY_TEMPLATE: [&str; 8] = [
    "Groceries",
    "Rent/Mortgage",
    "Utilities",
    "Transport",
    "Entertainment",
    "Health",
    SAVINGS,
    "Other",
];

/// Values propagated from one month into the next at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Carryover {
    pub debt: Decimal,
    /// Planned Savings budget of the predecessor, not the amount actually saved.
    pub savings_budget: Decimal,
}

impl Carryover {
    /// Derives the carryover from a finished (or in-progress) month.
    pub fn from_month(previous: &BudgetMonth) -> Self {
        let payments = previous
            .credit_card_payments()
            .map(|category| total(&category.expenses))
            .unwrap_or(Decimal::ZERO);
        let savings_budget = previous
            .savings()
            .map(|category| category.budgeted_amount)
            .unwrap_or(Decimal::ZERO);
        Self {
            debt: (previous.starting_credit_card_debt - payments).max(Decimal::ZERO),
            savings_budget,
        }
    }

    pub fn from_previous(previous: Option<&BudgetMonth>) -> Self {
        previous.map(Self::from_month).unwrap_or_default()
    }
}

pub struct MonthFactory;

impl MonthFactory {
    /// Creates `id` using the default category template.
    pub fn create(id: MonthId, months: &BTreeMap<MonthId, BudgetMonth>) -> BudgetMonth {
        Self::create_with_template(id, months, &DEFAULT_CATEGORY_TEMPLATE)
    }

    /// Creates `id` from an explicit template of category names.
    pub fn create_with_template<S: AsRef<str>>(
        id: MonthId,
        months: &BTreeMap<MonthId, BudgetMonth>,
        template: &[S],
    ) -> BudgetMonth {
        let carryover = Carryover::from_previous(months.get(&id.previous()));
        let categories = template
            .iter()
            .map(|name| name.as_ref().trim())
            .filter(|name| !name.is_empty())
            .map(|name| match reserved_name(name) {
                Some(SAVINGS) => BudgetCategory::system(SAVINGS, carryover.savings_budget),
                Some(reserved) => BudgetCategory::system(reserved, Decimal::ZERO),
                None => BudgetCategory::new(name, Decimal::ZERO),
            })
            .collect();
        let (mut categories, _) = normalize_system_categories(categories);
        if let Some(savings) = categories
            .iter_mut()
            .find(|category| category.is_system_category && category.name == SAVINGS)
        {
            savings.budgeted_amount = carryover.savings_budget;
        }

        info!(
            month = %id,
            debt = %carryover.debt,
            savings = %carryover.savings_budget,
            "creating month"
        );
        BudgetMonth {
            categories,
            starting_credit_card_debt: carryover.debt,
            ..BudgetMonth::empty(id)
        }
    }
}
