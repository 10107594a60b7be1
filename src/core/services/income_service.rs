use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{BudgetMonth, IncomeEntry};

use super::{require_name, require_positive, ServiceError, ServiceResult};

pub struct IncomeService;

impl IncomeService {
    pub fn add(
        month: &mut BudgetMonth,
        description: &str,
        amount: Decimal,
        date_added: DateTime<Utc>,
    ) -> ServiceResult<Uuid> {
        let description = require_name(description, "Income description")?;
        let amount = require_positive(amount, "Income amount")?;
        let income = IncomeEntry::new(description, amount, date_added);
        let id = income.id;
        month.incomes.push(income);
        Ok(id)
    }

    pub fn remove(month: &mut BudgetMonth, income_id: Uuid) -> ServiceResult<()> {
        let before = month.incomes.len();
        month.incomes.retain(|income| income.id != income_id);
        if month.incomes.len() == before {
            return Err(ServiceError::NotFound(format!("Income {income_id}")));
        }
        Ok(())
    }
}
