//! The month store: the session's single source of truth for month data.
//!
//! Every mutation follows the same path: make sure the month exists and is
//! well formed, leave closed months alone, apply a service transformation to
//! a snapshot, repair the snapshot, swap it into the map and queue a write to
//! the persistence collaborator. Memory is updated before the write, and a
//! failed write never rolls memory back.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{BudgetMonth, MonthId};
use crate::errors::BudgetError;
use crate::storage::MonthStorage;
use crate::suggestions::{
    BudgetPlanRequest, CategoryOption, SuggestedCategory, SuggestedExpense, SuggestionDocument,
    SuggestionProvider,
};

use super::month_factory::{MonthFactory, DEFAULT_CATEGORY_TEMPLATE};
use super::normalizer::normalize_month;
use super::persistence::{PersistenceEvent, PersistencePolicy, PersistenceWriter};
use super::services::{
    AiBudgetReport, BudgetService, CategoryPatch, CategoryService, ExpenseService, ExpenseTarget,
    IncomeService, MonthBudgetPayload, MonthSummary, RolloverReport, ServiceError, ServiceResult,
    SubCategoryPatch, SummaryService,
};

/// Outcome of loading a user's months at session start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub loaded: usize,
    /// Months that needed repair and were written back.
    pub corrected: Vec<MonthId>,
}

pub struct MonthManager {
    user_id: String,
    months: BTreeMap<MonthId, BudgetMonth>,
    writer: PersistenceWriter,
    template: Vec<String>,
}

impl MonthManager {
    pub fn new(user_id: impl Into<String>, storage: Box<dyn MonthStorage>) -> Self {
        let user_id = user_id.into();
        let storage: Arc<dyn MonthStorage> = Arc::from(storage);
        Self {
            writer: PersistenceWriter::spawn(user_id.clone(), storage),
            user_id,
            months: BTreeMap::new(),
            template: DEFAULT_CATEGORY_TEMPLATE
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }

    /// Builds a manager for the configured user, template and write policy.
    pub fn from_config(config: &Config, storage: Box<dyn MonthStorage>) -> Self {
        let manager = Self::new(config.user_id.clone(), storage)
            .with_policy(PersistencePolicy::with_retries(
                config.persistence.retry_attempts,
            ));
        if config.default_categories.is_empty() {
            manager
        } else {
            manager.with_template(config.default_categories.clone())
        }
    }

    pub fn with_policy(self, policy: PersistencePolicy) -> Self {
        self.writer.set_policy(policy);
        self
    }

    pub fn with_template(mut self, template: Vec<String>) -> Self {
        self.template = template;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.writer.policy()
    }

    pub fn storage(&self) -> &dyn MonthStorage {
        self.writer.storage()
    }

    pub fn month(&self, id: MonthId) -> Option<&BudgetMonth> {
        self.months.get(&id)
    }

    pub fn months(&self) -> impl Iterator<Item = &BudgetMonth> {
        self.months.values()
    }

    pub fn summarize(&self, id: MonthId) -> Option<MonthSummary> {
        self.month(id).map(SummaryService::summarize)
    }

    /// Blocks until every queued write has reached storage.
    pub fn flush_persistence(&self) {
        self.writer.flush();
    }

    /// Waits for queued writes, then drains the outcomes recorded since the
    /// last call. Only the newest `EVENT_LOG_CAPACITY` outcomes are kept.
    pub fn take_persistence_events(&mut self) -> Vec<PersistenceEvent> {
        self.writer.take_events()
    }

    /// Replaces the in-memory map with the user's persisted months, repairing
    /// each one and writing back only those that changed.
    pub fn load(&mut self) -> Result<LoadReport, BudgetError> {
        self.writer.flush();
        let stored = self.writer.storage().load_all_months(&self.user_id)?;
        let mut report = LoadReport {
            loaded: stored.len(),
            corrected: Vec::new(),
        };
        self.months.clear();
        for (id, mut month) in stored {
            month.id = id;
            if normalize_month(&mut month) {
                report.corrected.push(id);
            }
            self.months.insert(id, month);
        }
        for id in &report.corrected {
            if let Some(month) = self.months.get(id) {
                self.writer.dispatch(month.clone());
            }
        }
        info!(
            user = %self.user_id,
            loaded = report.loaded,
            corrected = report.corrected.len(),
            "months loaded"
        );
        Ok(report)
    }

    /// Returns the month, creating it from its predecessor when absent. An
    /// existing month is repaired and written back only if it needed repair.
    pub fn ensure_month_exists(&mut self, id: MonthId) -> BudgetMonth {
        if let Some(existing) = self.months.get(&id) {
            let mut month = existing.clone();
            if normalize_month(&mut month) {
                debug!(month = %id, "repaired stored month");
                self.commit(month.clone());
            }
            return month;
        }
        let month = MonthFactory::create_with_template(id, &self.months, &self.template);
        self.commit(month.clone());
        month
    }

    pub fn add_expense(
        &mut self,
        id: MonthId,
        target: ExpenseTarget,
        description: &str,
        amount: Decimal,
        date_added: DateTime<Utc>,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "add_expense", |month| {
            ExpenseService::add(month, target, description, amount, date_added).map(drop)
        })
    }

    pub fn delete_expense(
        &mut self,
        id: MonthId,
        target: ExpenseTarget,
        expense_id: Uuid,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "delete_expense", |month| {
            ExpenseService::remove(month, target, expense_id)
        })
    }

    pub fn add_income(
        &mut self,
        id: MonthId,
        description: &str,
        amount: Decimal,
        date_added: DateTime<Utc>,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "add_income", |month| {
            IncomeService::add(month, description, amount, date_added).map(drop)
        })
    }

    pub fn delete_income(&mut self, id: MonthId, income_id: Uuid) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "delete_income", |month| {
            IncomeService::remove(month, income_id)
        })
    }

    pub fn add_category(&mut self, id: MonthId, name: &str) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "add_category", |month| {
            CategoryService::add(month, name).map(drop)
        })
    }

    pub fn update_category(
        &mut self,
        id: MonthId,
        category_id: Uuid,
        patch: CategoryPatch,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "update_category", |month| {
            CategoryService::edit(month, category_id, patch)
        })
    }

    /// Deleting a system category leaves the month unchanged.
    pub fn delete_category(
        &mut self,
        id: MonthId,
        category_id: Uuid,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "delete_category", |month| {
            CategoryService::remove(month, category_id).map(drop)
        })
    }

    pub fn add_subcategory(
        &mut self,
        id: MonthId,
        parent_id: Uuid,
        name: &str,
        budgeted_amount: Decimal,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "add_subcategory", |month| {
            CategoryService::add_subcategory(month, parent_id, name, budgeted_amount).map(drop)
        })
    }

    pub fn update_subcategory(
        &mut self,
        id: MonthId,
        parent_id: Uuid,
        sub_id: Uuid,
        patch: SubCategoryPatch,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "update_subcategory", |month| {
            CategoryService::edit_subcategory(month, parent_id, sub_id, patch)
        })
    }

    pub fn delete_subcategory(
        &mut self,
        id: MonthId,
        parent_id: Uuid,
        sub_id: Uuid,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "delete_subcategory", |month| {
            CategoryService::remove_subcategory(month, parent_id, sub_id)
        })
    }

    pub fn update_month_budget(
        &mut self,
        id: MonthId,
        payload: MonthBudgetPayload,
    ) -> ServiceResult<BudgetMonth> {
        self.mutate(id, "update_month_budget", |month| {
            BudgetService::apply_payload(month, payload)
        })
    }

    /// Rebuilds `target_id` from the category names and budgets of
    /// `source_id`. Debt and the Savings budget carry over from the month
    /// before the target when it exists, otherwise from the source.
    pub fn duplicate_month_budget(
        &mut self,
        source_id: MonthId,
        target_id: MonthId,
    ) -> ServiceResult<BudgetMonth> {
        if source_id == target_id {
            return Err(ServiceError::Invalid(
                "Cannot duplicate a month onto itself".into(),
            ));
        }
        let source = self.ensure_month_exists(source_id);
        if let Some(target) = self.months.get(&target_id).filter(|m| m.is_closed()) {
            debug!(month = %target_id, "ignoring duplicate onto closed month");
            return Ok(target.clone());
        }
        let predecessor = self.months.get(&target_id.previous());
        let month = BudgetService::duplicate(&source, target_id, predecessor);
        info!(source = %source_id, target = %target_id, "duplicated month budget");
        self.commit(month.clone());
        Ok(month)
    }

    /// Closes the month. The unspent figure is reported, not moved anywhere.
    pub fn rollover_unspent_budget(&mut self, id: MonthId) -> ServiceResult<RolloverReport> {
        let mut month = self.ensure_month_exists(id);
        if month.is_closed() {
            return Err(ServiceError::MonthClosed(id));
        }
        let unspent_total = BudgetService::rollover(&mut month);
        info!(month = %id, unspent = %unspent_total, "month rolled over");
        self.commit(month.clone());
        Ok(RolloverReport {
            month,
            unspent_total,
        })
    }

    pub fn apply_ai_generated_budget(
        &mut self,
        target_id: MonthId,
        suggested: &[SuggestedCategory],
        income: Option<Decimal>,
        prior_debt: Option<Decimal>,
        prior_credit_card_payment: Option<Decimal>,
    ) -> ServiceResult<AiBudgetReport> {
        let month = self.mutate(target_id, "apply_ai_generated_budget", |month| {
            BudgetService::apply_suggested_budget(
                month,
                suggested,
                prior_debt,
                prior_credit_card_payment,
            );
            Ok(())
        })?;
        let total_budgeted = SummaryService::total_budgeted(&month);
        let unallocated = income.map(|income| income - total_budgeted);
        if unallocated.is_some_and(|left| left < Decimal::ZERO) {
            warn!(month = %target_id, %total_budgeted, "suggested budget exceeds income");
        }
        Ok(AiBudgetReport {
            month,
            total_budgeted,
            unallocated,
        })
    }

    /// Records suggested expense items; returns the month and how many items
    /// were accepted.
    pub fn apply_expense_suggestions(
        &mut self,
        id: MonthId,
        items: &[SuggestedExpense],
        date_added: DateTime<Utc>,
    ) -> ServiceResult<(BudgetMonth, usize)> {
        let mut applied = 0;
        let month = self.mutate(id, "apply_expense_suggestions", |month| {
            applied = ExpenseService::apply_suggestions(month, items, date_added);
            Ok(())
        })?;
        Ok((month, applied))
    }

    /// Asks the provider to read expenses from a document and records them.
    /// Provider failures are returned as-is and leave the store untouched.
    pub fn suggest_expenses(
        &mut self,
        provider: &dyn SuggestionProvider,
        id: MonthId,
        document: &SuggestionDocument,
    ) -> ServiceResult<(BudgetMonth, usize)> {
        let month = self.ensure_month_exists(id);
        let items = provider.suggest_expenses(document, &category_options(&month))?;
        self.apply_expense_suggestions(id, &items, Utc::now())
    }

    /// Requests a budget plan and applies it to `target_id`. Returns the
    /// report together with the provider's advice text.
    pub fn plan_budget(
        &mut self,
        provider: &dyn SuggestionProvider,
        target_id: MonthId,
        request: &BudgetPlanRequest,
    ) -> ServiceResult<(AiBudgetReport, String)> {
        let plan = provider.suggest_budget(request)?;
        let report = self.apply_ai_generated_budget(
            target_id,
            &plan.categories,
            request.income,
            request.prior_debt,
            request.prior_credit_card_payment,
        )?;
        Ok((report, plan.advice))
    }

    fn mutate<F>(
        &mut self,
        id: MonthId,
        operation: &'static str,
        apply: F,
    ) -> ServiceResult<BudgetMonth>
    where
        F: FnOnce(&mut BudgetMonth) -> ServiceResult<()>,
    {
        let current = self.ensure_month_exists(id);
        if current.is_closed() {
            debug!(month = %id, operation, "ignoring mutation of closed month");
            return Ok(current);
        }
        let mut snapshot = current.clone();
        apply(&mut snapshot)?;
        normalize_month(&mut snapshot);
        if snapshot != current {
            self.commit(snapshot.clone());
        }
        Ok(snapshot)
    }

    fn commit(&mut self, month: BudgetMonth) {
        self.months.insert(month.id, month.clone());
        self.writer.dispatch(month);
    }
}

fn category_options(month: &BudgetMonth) -> Vec<CategoryOption> {
    month
        .categories
        .iter()
        .flat_map(|category| {
            let parent = CategoryOption {
                id: category.id,
                name: category.name.clone(),
            };
            let subs = category.subcategories.iter().map(move |sub| CategoryOption {
                id: sub.id,
                name: format!("{} / {}", category.name, sub.name),
            });
            std::iter::once(parent).chain(subs)
        })
        .collect()
}
