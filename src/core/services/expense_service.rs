use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{BudgetMonth, Expense};
use crate::suggestions::SuggestedExpense;

use super::{require_name, require_positive, ServiceError, ServiceResult};

const SUGGESTED_EXPENSE_DESCRIPTION: &str = "Suggested expense";

/// Where an expense is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseTarget {
    Category(Uuid),
    SubCategory(Uuid),
}

pub struct ExpenseService;

impl ExpenseService {
    pub fn add(
        month: &mut BudgetMonth,
        target: ExpenseTarget,
        description: &str,
        amount: Decimal,
        date_added: DateTime<Utc>,
    ) -> ServiceResult<Uuid> {
        let description = require_name(description, "Expense description")?;
        let amount = require_positive(amount, "Expense amount")?;
        let expense = Expense::new(description, amount, date_added);
        let id = expense.id;
        Self::expenses_mut(month, target)?.push(expense);
        Ok(id)
    }

    pub fn remove(
        month: &mut BudgetMonth,
        target: ExpenseTarget,
        expense_id: Uuid,
    ) -> ServiceResult<()> {
        let expenses = Self::expenses_mut(month, target)?;
        let before = expenses.len();
        expenses.retain(|expense| expense.id != expense_id);
        if expenses.len() == before {
            return Err(ServiceError::NotFound(format!("Expense {expense_id}")));
        }
        Ok(())
    }

    /// Records suggested expense items, skipping those without a known
    /// category or a positive amount. Returns how many were recorded.
    pub fn apply_suggestions(
        month: &mut BudgetMonth,
        items: &[SuggestedExpense],
        date_added: DateTime<Utc>,
    ) -> usize {
        let mut applied = 0;
        for item in items {
            let Some(category_id) = item.category_id else {
                debug!("skipping suggestion without category");
                continue;
            };
            let amount = item.amount.unwrap_or(Decimal::ZERO);
            let description = item
                .description
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or(SUGGESTED_EXPENSE_DESCRIPTION);
            let target = if month.category(category_id).is_some() {
                ExpenseTarget::Category(category_id)
            } else {
                ExpenseTarget::SubCategory(category_id)
            };
            match Self::add(month, target, description, amount, date_added) {
                Ok(_) => applied += 1,
                Err(err) => debug!(%category_id, error = %err, "skipping suggestion"),
            }
        }
        applied
    }

    fn expenses_mut(
        month: &mut BudgetMonth,
        target: ExpenseTarget,
    ) -> ServiceResult<&mut Vec<Expense>> {
        match target {
            ExpenseTarget::Category(id) => {
                let category = month
                    .category_mut(id)
                    .ok_or_else(|| ServiceError::NotFound(format!("Category {id}")))?;
                if !category.is_system_category && category.has_subcategories() {
                    return Err(ServiceError::Invalid(format!(
                        "Category `{}` has subcategories; record the expense on one of them",
                        category.name
                    )));
                }
                Ok(&mut category.expenses)
            }
            ExpenseTarget::SubCategory(id) => month
                .parent_of_subcategory_mut(id)
                .and_then(|parent| parent.subcategory_mut(id))
                .map(|sub| &mut sub.expenses)
                .ok_or_else(|| ServiceError::NotFound(format!("Subcategory {id}"))),
        }
    }
}
