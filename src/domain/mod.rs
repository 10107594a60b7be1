//! Pure month models: entities, identifiers and their invariant helpers.
//! No I/O happens in this module.

pub mod category;
pub mod common;
pub mod expense;
pub mod month;

pub use category::{
    BudgetCategory, SubCategory, CREDIT_CARD_PAYMENTS, RESERVED_CATEGORY_NAMES, SAVINGS,
};
pub use common::{Amounted, Identifiable, MonthId, NamedEntity};
pub use expense::{Expense, IncomeEntry};
pub use month::BudgetMonth;
