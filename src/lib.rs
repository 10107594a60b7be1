#![doc(test(attr(deny(warnings))))]

//! Budget Months keeps per-month budgets, incomes and expenses, enforces the
//! reserved Savings and Credit Card Payments categories, and carries debt and
//! planned savings from one month into the next.

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod storage;
pub mod suggestions;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Budget Months tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
