pub mod month_factory;
pub mod month_manager;
pub mod normalizer;
pub mod persistence;
pub mod services;

pub use month_factory::{Carryover, MonthFactory, DEFAULT_CATEGORY_TEMPLATE};
pub use month_manager::{LoadReport, MonthManager};
pub use normalizer::{normalize_month, normalize_system_categories, sync_derived_budgets};
pub use persistence::{
    PersistenceEvent, PersistenceOutcome, PersistencePolicy, EVENT_LOG_CAPACITY,
};
