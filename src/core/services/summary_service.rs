//! Read-side aggregation over a month. Nothing here mutates state.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{common::total, BudgetCategory, BudgetMonth, MonthId, SubCategory};

/// Per-category figures for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStatus {
    pub id: Uuid,
    pub name: String,
    pub is_system_category: bool,
    pub budgeted: Decimal,
    pub spent: Decimal,
    /// `None` for system categories, which track a goal instead.
    pub remaining: Option<Decimal>,
    pub overspent: bool,
    pub goal_met: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subcategories: Vec<SubCategoryStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryStatus {
    pub id: Uuid,
    pub name: String,
    pub budgeted: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub id: MonthId,
    pub total_income: Decimal,
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub unallocated: Decimal,
    pub starting_credit_card_debt: Decimal,
    pub debt_at_end_of_month: Decimal,
    pub is_rolled_over: bool,
    pub categories: Vec<CategoryStatus>,
}

pub struct SummaryService;

impl SummaryService {
    pub fn spent(category: &BudgetCategory) -> Decimal {
        category.spent()
    }

    pub fn subcategory_spent(sub: &SubCategory) -> Decimal {
        sub.spent()
    }

    /// Budget left in a user category; system categories have no remaining.
    pub fn remaining(category: &BudgetCategory) -> Option<Decimal> {
        if category.is_system_category {
            None
        } else {
            Some(category.effective_budget() - category.spent())
        }
    }

    pub fn subcategory_remaining(sub: &SubCategory) -> Decimal {
        sub.budgeted_amount - sub.spent()
    }

    pub fn overspent(category: &BudgetCategory) -> bool {
        Self::remaining(category).is_some_and(|remaining| remaining < Decimal::ZERO)
    }

    /// A system category meets its goal once spending reaches a positive budget.
    pub fn goal_met(category: &BudgetCategory) -> bool {
        category.is_system_category
            && category.budgeted_amount > Decimal::ZERO
            && category.spent() >= category.budgeted_amount
    }

    pub fn debt_at_end_of_month(month: &BudgetMonth) -> Decimal {
        let payments = month
            .credit_card_payments()
            .map(BudgetCategory::spent)
            .unwrap_or(Decimal::ZERO);
        (month.starting_credit_card_debt - payments).max(Decimal::ZERO)
    }

    pub fn total_budgeted(month: &BudgetMonth) -> Decimal {
        month
            .categories
            .iter()
            .map(BudgetCategory::effective_budget)
            .sum()
    }

    pub fn total_income(month: &BudgetMonth) -> Decimal {
        total(&month.incomes)
    }

    pub fn total_spent(month: &BudgetMonth) -> Decimal {
        month.categories.iter().map(BudgetCategory::spent).sum()
    }

    pub fn unallocated(month: &BudgetMonth) -> Decimal {
        Self::total_income(month) - Self::total_budgeted(month)
    }

    pub fn category_status(category: &BudgetCategory) -> CategoryStatus {
        CategoryStatus {
            id: category.id,
            name: category.name.clone(),
            is_system_category: category.is_system_category,
            budgeted: category.effective_budget(),
            spent: category.spent(),
            remaining: Self::remaining(category),
            overspent: Self::overspent(category),
            goal_met: Self::goal_met(category),
            subcategories: category
                .subcategories
                .iter()
                .map(|sub| SubCategoryStatus {
                    id: sub.id,
                    name: sub.name.clone(),
                    budgeted: sub.budgeted_amount,
                    spent: Self::subcategory_spent(sub),
                    remaining: Self::subcategory_remaining(sub),
                })
                .collect(),
        }
    }

    pub fn summarize(month: &BudgetMonth) -> MonthSummary {
        MonthSummary {
            id: month.id,
            total_income: Self::total_income(month),
            total_budgeted: Self::total_budgeted(month),
            total_spent: Self::total_spent(month),
            unallocated: Self::unallocated(month),
            starting_credit_card_debt: month.starting_credit_card_debt,
            debt_at_end_of_month: Self::debt_at_end_of_month(month),
            is_rolled_over: month.is_rolled_over,
            categories: month.categories.iter().map(Self::category_status).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonthFactory;
    use crate::domain::{Expense, IncomeEntry, CREDIT_CARD_PAYMENTS, SAVINGS};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn month() -> BudgetMonth {
        let mut month = MonthFactory::create("2025-06".parse().unwrap(), &BTreeMap::new());
        month
            .incomes
            .push(IncomeEntry::new("Salary", dec!(3000), Utc::now()));
        month.starting_credit_card_debt = dec!(1000);
        for category in month.categories.iter_mut() {
            match category.name.as_str() {
                "Groceries" => {
                    category.subcategories.push(SubCategory::new("Produce", dec!(50)));
                    category.subcategories.push(SubCategory::new("Dairy", dec!(30)));
                    category.budgeted_amount = dec!(80);
                    category.subcategories[0]
                        .expenses
                        .push(Expense::new("Veg", dec!(95), Utc::now()));
                }
                "Rent/Mortgage" => category.budgeted_amount = dec!(1200),
                SAVINGS => {
                    category.budgeted_amount = dec!(200);
                    category
                        .expenses
                        .push(Expense::new("Transfer", dec!(200), Utc::now()));
                }
                CREDIT_CARD_PAYMENTS => {
                    category.budgeted_amount = dec!(300);
                    category
                        .expenses
                        .push(Expense::new("Card", dec!(300), Utc::now()));
                }
                _ => {}
            }
        }
        month
    }

    #[test]
    fn totals_do_not_double_count_subcategories() {
        let month = month();
        assert_eq!(SummaryService::total_budgeted(&month), dec!(1780));
        assert_eq!(SummaryService::total_income(&month), dec!(3000));
        assert_eq!(SummaryService::unallocated(&month), dec!(1220));
        assert_eq!(SummaryService::total_spent(&month), dec!(595));
    }

    #[test]
    fn overspend_is_reported_for_user_categories_only() {
        let month = month();
        let groceries = month.categories.iter().find(|c| c.name == "Groceries").unwrap();
        assert_eq!(SummaryService::remaining(groceries), Some(dec!(-15)));
        assert!(SummaryService::overspent(groceries));

        let savings = month.savings().unwrap();
        assert_eq!(SummaryService::remaining(savings), None);
        assert!(!SummaryService::overspent(savings));
        assert!(SummaryService::goal_met(savings));
    }

    #[test]
    fn zero_budget_goal_is_never_met() {
        let month = MonthFactory::create("2025-06".parse().unwrap(), &BTreeMap::new());
        assert!(!SummaryService::goal_met(month.savings().unwrap()));
    }

    #[test]
    fn debt_at_end_of_month_subtracts_card_payments() {
        let month = month();
        assert_eq!(SummaryService::debt_at_end_of_month(&month), dec!(700));
        let summary = SummaryService::summarize(&month);
        assert_eq!(summary.debt_at_end_of_month, dec!(700));
        assert_eq!(summary.categories.len(), month.categories.len());
    }

    #[test]
    fn category_status_lists_subcategory_figures() {
        let month = month();
        let groceries = month.categories.iter().find(|c| c.name == "Groceries").unwrap();
        let status = SummaryService::category_status(groceries);
        assert_eq!(status.subcategories.len(), 2);
        let produce = &status.subcategories[0];
        assert_eq!(produce.name, "Produce");
        assert_eq!(produce.spent, dec!(95));
        assert_eq!(produce.remaining, dec!(-45));
        assert_eq!(status.subcategories[1].remaining, dec!(30));

        let rent = month.categories.iter().find(|c| c.name == "Rent/Mortgage").unwrap();
        assert!(SummaryService::category_status(rent).subcategories.is_empty());
    }
}
