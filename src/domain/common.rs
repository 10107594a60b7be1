//! Shared traits and the month key used across the entity model.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::BudgetError;

/// Exposes a stable identifier for entities stored in a month.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Provides read-only access to an entity's display name.
pub trait NamedEntity {
    fn name(&self) -> &str;
}

/// Supplies a common contract for retrieving currency amounts.
pub trait Amounted {
    fn amount(&self) -> Decimal;
}

/// Sums the amounts of a slice of entries.
pub fn total<T: Amounted>(items: &[T]) -> Decimal {
    items.iter().map(Amounted::amount).sum()
}

const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

/// Calendar month key, rendered and persisted as zero-padded `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthId {
    year: i32,
    month: u32,
}

impl MonthId {
    pub fn new(year: i32, month: u32) -> Result<Self, BudgetError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(BudgetError::InvalidMonthId(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year().clamp(MIN_YEAR, MAX_YEAR),
            month: date.month(),
        }
    }

    /// Month containing today's date in UTC.
    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Calendar predecessor; January steps back into December of the prior year.
    /// Saturates at `0000-01`.
    pub fn previous(self) -> Self {
        match (self.year, self.month) {
            (MIN_YEAR, 1) => self,
            (year, 1) => Self {
                year: year - 1,
                month: 12,
            },
            (year, month) => Self {
                year,
                month: month - 1,
            },
        }
    }

    /// Calendar successor. Saturates at `9999-12`.
    pub fn next(self) -> Self {
        match (self.year, self.month) {
            (MAX_YEAR, 12) => self,
            (year, 12) => Self {
                year: year + 1,
                month: 1,
            },
            (year, month) => Self {
                year,
                month: month + 1,
            },
        }
    }
}

impl fmt::Display for MonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthId {
    type Err = BudgetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || BudgetError::InvalidMonthId(value.to_string());
        let (year, month) = value.trim().split_once('-').ok_or_else(invalid)?;
        let digits = |part: &str, len: usize| {
            part.len() == len && part.chars().all(|c| c.is_ascii_digit())
        };
        if !digits(year, 4) || !digits(month, 2) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        MonthId::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MonthId {
    type Error = BudgetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthId> for String {
    fn from(id: MonthId) -> Self {
        id.to_string()
    }
}
