//! Money movements recorded against a month: expenses and incomes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::common::{Amounted, Identifiable};

/// A single outgoing payment, owned by one category or subcategory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date_added: DateTime<Utc>,
}

impl Expense {
    pub fn new(description: impl Into<String>, amount: Decimal, date_added: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
            date_added,
        }
    }
}

impl Identifiable for Expense {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for Expense {
    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Money received during the month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeEntry {
    pub id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub date_added: DateTime<Utc>,
}

impl IncomeEntry {
    pub fn new(description: impl Into<String>, amount: Decimal, date_added: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            amount,
            date_added,
        }
    }
}

impl Identifiable for IncomeEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Amounted for IncomeEntry {
    fn amount(&self) -> Decimal {
        self.amount
    }
}
