//! Stateless month transformations. Each service edits a `BudgetMonth`
//! snapshot in place; the month manager owns ensuring, gating, normalizing
//! and persisting around them.

pub mod budget_service;
pub mod category_service;
pub mod expense_service;
pub mod income_service;
pub mod summary_service;

pub use budget_service::{
    AiBudgetReport, BudgetService, CategoryPayload, MonthBudgetPayload, RolloverReport,
    SubCategoryPayload,
};
pub use category_service::{CategoryPatch, CategoryService, SubCategoryPatch};
pub use expense_service::{ExpenseService, ExpenseTarget};
pub use income_service::IncomeService;
pub use summary_service::{CategoryStatus, MonthSummary, SubCategoryStatus, SummaryService};

use rust_decimal::Decimal;

use crate::{domain::MonthId, errors::BudgetError, suggestions::SuggestionError};

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error("{0}")]
    Invalid(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Month {0} is already closed")]
    MonthClosed(MonthId),
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),
}

/// Trims and rejects empty names.
pub(crate) fn require_name(value: &str, what: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Invalid(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_positive(amount: Decimal, what: &str) -> ServiceResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::Invalid(format!(
            "{what} must be greater than zero"
        )));
    }
    Ok(amount)
}

pub(crate) fn require_non_negative(amount: Decimal, what: &str) -> ServiceResult<Decimal> {
    if amount < Decimal::ZERO {
        return Err(ServiceError::Invalid(format!("{what} cannot be negative")));
    }
    Ok(amount)
}
