//! Whole-month budget operations: bulk payload replacement, duplication,
//! suggested plans and the rollover close.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::core::month_factory::Carryover;
use crate::core::normalizer::normalize_month;
use crate::domain::{
    category::reserved_name, BudgetCategory, BudgetMonth, Expense, Identifiable, MonthId,
    NamedEntity, SubCategory, SAVINGS,
};
use crate::suggestions::SuggestedCategory;

use super::{require_name, require_non_negative, ServiceError, ServiceResult};

/// Bulk replacement of a month's debt and/or category tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBudgetPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_credit_card_debt: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryPayload>>,
}

/// Incoming category. Missing ids, expenses and subcategories are taken from
/// the existing category with the same id, or else the same name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub budgeted_amount: Decimal,
    #[serde(default)]
    pub expenses: Option<Vec<Expense>>,
    #[serde(default)]
    pub subcategories: Option<Vec<SubCategoryPayload>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubCategoryPayload {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub budgeted_amount: Decimal,
    #[serde(default)]
    pub expenses: Option<Vec<Expense>>,
}

/// Result of closing a month.
#[derive(Debug, Clone, PartialEq)]
pub struct RolloverReport {
    pub month: BudgetMonth,
    /// Positive budget left over across user categories. Informational only;
    /// no category receives it.
    pub unspent_total: Decimal,
}

/// Result of applying a suggested budget plan.
#[derive(Debug, Clone, PartialEq)]
pub struct AiBudgetReport {
    pub month: BudgetMonth,
    pub total_budgeted: Decimal,
    /// Income minus total budgeted, when an income figure was supplied.
    pub unallocated: Option<Decimal>,
}

pub struct BudgetService;

impl BudgetService {
    /// Replaces the debt and/or category tree. Each incoming entry claims at
    /// most one existing category, by id first and then by name, and inherits
    /// its id and any expenses or subcategories it leaves out. System
    /// categories keep their name and stay flat; only their budget and
    /// expenses follow the payload. System categories missing from the
    /// payload are kept as they are.
    pub fn apply_payload(
        month: &mut BudgetMonth,
        payload: MonthBudgetPayload,
    ) -> ServiceResult<()> {
        if let Some(debt) = payload.starting_credit_card_debt {
            require_non_negative(debt, "Starting credit card debt")?;
        }
        let matches = match payload.categories.as_deref() {
            Some(incoming) => Some(Self::match_payload(month, incoming)?),
            None => None,
        };

        if let Some(debt) = payload.starting_credit_card_debt {
            month.starting_credit_card_debt = debt;
        }
        if let (Some(incoming), Some(matches)) = (payload.categories, matches) {
            let mut pool: Vec<Option<BudgetCategory>> = std::mem::take(&mut month.categories)
                .into_iter()
                .map(Some)
                .collect();
            month.categories = incoming
                .into_iter()
                .zip(matches)
                .map(|(category, matched)| {
                    merge_category(category, matched.and_then(|index| pool[index].take()))
                })
                .collect();
            // System categories cannot be dropped by leaving them out.
            month.categories.extend(
                pool.into_iter()
                    .flatten()
                    .filter(|category| category.is_system_category),
            );
        }
        Ok(())
    }

    /// Validates incoming categories and pairs each with the index of the
    /// existing category it replaces.
    fn match_payload(
        month: &BudgetMonth,
        incoming: &[CategoryPayload],
    ) -> ServiceResult<Vec<Option<usize>>> {
        for category in incoming {
            require_name(&category.name, "Category name")?;
            require_non_negative(category.budgeted_amount, "Budgeted amount")?;
            let subs = category.subcategories.as_deref().unwrap_or_default();
            for sub in subs {
                require_name(&sub.name, "Subcategory name")?;
                require_non_negative(sub.budgeted_amount, "Budgeted amount")?;
            }
            let sub_keys: Vec<_> = subs.iter().map(|s| (s.id, s.name.as_str())).collect();
            reject_duplicate_keys(&sub_keys, "Subcategory")?;
        }
        let keys: Vec<_> = incoming.iter().map(|c| (c.id, c.name.as_str())).collect();
        reject_duplicate_keys(&keys, "Category")?;

        let matches = match_existing(&entity_keys(&month.categories), &keys);
        for (category, matched) in incoming.iter().zip(&matches) {
            let is_system =
                matched.map_or(false, |index| month.categories[index].is_system_category);
            if let (false, Some(reserved)) = (is_system, reserved_name(&category.name)) {
                return Err(ServiceError::Invalid(format!(
                    "`{reserved}` is a reserved category name"
                )));
            }
        }
        Ok(matches)
    }

    /// Builds `target_id` from the names and budgets of `source`, with no
    /// expenses or incomes. Carryover comes from `predecessor` (the existing
    /// month before the target) when present, otherwise from `source`.
    pub fn duplicate(
        source: &BudgetMonth,
        target_id: MonthId,
        predecessor: Option<&BudgetMonth>,
    ) -> BudgetMonth {
        let carryover = Carryover::from_month(predecessor.unwrap_or(source));
        let categories = source
            .categories
            .iter()
            .map(|category| {
                let budgeted_amount = if category.is_system_category && category.name == SAVINGS {
                    carryover.savings_budget
                } else {
                    category.budgeted_amount
                };
                BudgetCategory {
                    budgeted_amount,
                    subcategories: category
                        .subcategories
                        .iter()
                        .map(|sub| SubCategory::new(sub.name.clone(), sub.budgeted_amount))
                        .collect(),
                    is_system_category: category.is_system_category,
                    ..BudgetCategory::new(category.name.clone(), Decimal::ZERO)
                }
            })
            .collect();
        let mut month = BudgetMonth {
            categories,
            starting_credit_card_debt: carryover.debt,
            ..BudgetMonth::empty(target_id)
        };
        normalize_month(&mut month);
        month
    }

    /// Sum of positive `budget - spent` across user categories, counted per
    /// subcategory where subcategories exist.
    pub fn unspent_total(month: &BudgetMonth) -> Decimal {
        let leftover = |budget: Decimal, spent: Decimal| (budget - spent).max(Decimal::ZERO);
        month
            .categories
            .iter()
            .filter(|category| !category.is_system_category)
            .map(|category| {
                if category.has_subcategories() {
                    category
                        .subcategories
                        .iter()
                        .map(|sub| leftover(sub.budgeted_amount, sub.spent()))
                        .sum::<Decimal>()
                } else {
                    leftover(category.budgeted_amount, category.spent())
                }
            })
            .sum()
    }

    /// Closes the month and reports what was left unspent.
    pub fn rollover(month: &mut BudgetMonth) -> Decimal {
        let unspent = Self::unspent_total(month);
        month.is_rolled_over = true;
        unspent
    }

    /// Replaces user categories with a suggested plan. System categories keep
    /// their ids and expenses; their budgets follow a suggestion with the same
    /// name when it carries an amount. Missing amounts count as zero for user
    /// categories and suggestions without a name are skipped.
    pub fn apply_suggested_budget(
        month: &mut BudgetMonth,
        suggested: &[SuggestedCategory],
        prior_debt: Option<Decimal>,
        prior_credit_card_payment: Option<Decimal>,
    ) {
        let mut categories: Vec<BudgetCategory> = std::mem::take(&mut month.categories)
            .into_iter()
            .filter(|category| category.is_system_category)
            .collect();
        let system_count = categories.len();

        for suggestion in suggested {
            let name = suggestion.name.trim();
            if name.is_empty() {
                debug!("skipping suggested category without a name");
                continue;
            }
            if let Some(reserved) = reserved_name(name) {
                if let (Some(system), Some(amount)) = (
                    categories[..system_count]
                        .iter_mut()
                        .find(|category| category.name == reserved),
                    suggestion.budgeted_amount,
                ) {
                    system.budgeted_amount = amount.max(Decimal::ZERO);
                }
                continue;
            }
            if categories
                .iter()
                .any(|category| category.name.eq_ignore_ascii_case(name))
            {
                debug!(name, "skipping duplicate suggested category");
                continue;
            }
            let subcategories: Vec<SubCategory> = suggestion
                .subcategories
                .iter()
                .filter(|sub| !sub.name.trim().is_empty())
                .map(|sub| {
                    SubCategory::new(
                        sub.name.trim(),
                        sub.budgeted_amount.unwrap_or_default().max(Decimal::ZERO),
                    )
                })
                .collect();
            let budget = suggestion
                .budgeted_amount
                .unwrap_or_default()
                .max(Decimal::ZERO);
            categories.push(BudgetCategory {
                subcategories,
                ..BudgetCategory::new(name, budget)
            });
        }

        month.categories = categories;
        if let Some(debt) = prior_debt {
            let paid = prior_credit_card_payment.unwrap_or_default();
            month.starting_credit_card_debt = (debt - paid).max(Decimal::ZERO);
        }
    }
}

fn entity_keys<T: Identifiable + NamedEntity>(items: &[T]) -> Vec<(Uuid, &str)> {
    items.iter().map(|item| (item.id(), item.name())).collect()
}

/// Pairs incoming `(id, name)` keys with distinct existing `(id, name)` keys:
/// ids first, then case-insensitive names among the existing items left over.
/// An incoming id that matches nothing is not retried by name.
fn match_existing(
    existing: &[(Uuid, &str)],
    incoming: &[(Option<Uuid>, &str)],
) -> Vec<Option<usize>> {
    let mut claimed = vec![false; existing.len()];
    let mut matches = vec![None; incoming.len()];
    for (slot, (id, _)) in incoming.iter().enumerate() {
        let Some(id) = id else { continue };
        if let Some(index) = existing.iter().position(|(existing_id, _)| existing_id == id) {
            if !claimed[index] {
                claimed[index] = true;
                matches[slot] = Some(index);
            }
        }
    }
    for (slot, (id, name)) in incoming.iter().enumerate() {
        if id.is_some() {
            continue;
        }
        let name = name.trim();
        let found = (0..existing.len()).find(|&index| {
            !claimed[index] && existing[index].1.trim().eq_ignore_ascii_case(name)
        });
        if let Some(index) = found {
            claimed[index] = true;
            matches[slot] = Some(index);
        }
    }
    matches
}

fn reject_duplicate_keys(keys: &[(Option<Uuid>, &str)], what: &str) -> ServiceResult<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for (id, name) in keys {
        if let Some(id) = id {
            if !ids.insert(*id) {
                return Err(ServiceError::Invalid(format!(
                    "{what} id {id} appears more than once"
                )));
            }
        }
        if !names.insert(name.trim().to_lowercase()) {
            return Err(ServiceError::Invalid(format!(
                "{what} `{}` appears more than once",
                name.trim()
            )));
        }
    }
    Ok(())
}

fn merge_category(incoming: CategoryPayload, existing: Option<BudgetCategory>) -> BudgetCategory {
    if let Some(system) = existing.as_ref().filter(|c| c.is_system_category) {
        if !incoming.name.trim().eq_ignore_ascii_case(&system.name) {
            debug!(name = %system.name, "ignoring rename of system category");
        }
        if incoming.subcategories.as_ref().is_some_and(|subs| !subs.is_empty()) {
            debug!(name = %system.name, "ignoring subcategories of system category");
        }
    }
    match existing {
        Some(system) if system.is_system_category => BudgetCategory {
            budgeted_amount: incoming.budgeted_amount,
            expenses: incoming.expenses.unwrap_or(system.expenses),
            ..system
        },
        existing => {
            let (id, expenses, existing_subs) = match existing {
                Some(c) => (Some(c.id), Some(c.expenses), c.subcategories),
                None => (None, None, Vec::new()),
            };
            let subcategories = match incoming.subcategories {
                Some(subs) => merge_subcategories(subs, existing_subs),
                None => existing_subs,
            };
            BudgetCategory {
                id: incoming.id.or(id).unwrap_or_else(Uuid::new_v4),
                name: incoming.name.trim().to_string(),
                budgeted_amount: incoming.budgeted_amount,
                expenses: incoming.expenses.or(expenses).unwrap_or_default(),
                subcategories,
                is_system_category: false,
            }
        }
    }
}

fn merge_subcategories(
    incoming: Vec<SubCategoryPayload>,
    existing: Vec<SubCategory>,
) -> Vec<SubCategory> {
    let keys: Vec<_> = incoming.iter().map(|s| (s.id, s.name.as_str())).collect();
    let matches = match_existing(&entity_keys(&existing), &keys);
    let mut pool: Vec<Option<SubCategory>> = existing.into_iter().map(Some).collect();
    incoming
        .into_iter()
        .zip(matches)
        .map(|(sub, matched)| {
            let matched = matched.and_then(|index| pool[index].take());
            let (id, expenses) = match matched {
                Some(s) => (Some(s.id), Some(s.expenses)),
                None => (None, None),
            };
            SubCategory {
                id: sub.id.or(id).unwrap_or_else(Uuid::new_v4),
                name: sub.name.trim().to_string(),
                budgeted_amount: sub.budgeted_amount,
                expenses: sub.expenses.or(expenses).unwrap_or_default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MonthFactory;
    use crate::domain::CREDIT_CARD_PAYMENTS;
    use crate::suggestions::SuggestedSubCategory;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn id(value: &str) -> MonthId {
        value.parse().unwrap()
    }

    fn month(value: &str) -> BudgetMonth {
        MonthFactory::create(id(value), &BTreeMap::new())
    }

    fn named<'a>(month: &'a BudgetMonth, name: &str) -> &'a BudgetCategory {
        month.categories.iter().find(|c| c.name == name).unwrap()
    }

    #[test]
    fn payload_merge_preserves_expenses_and_ids() {
        let mut month = month("2025-06");
        let rent_id = named(&month, "Rent/Mortgage").id;
        month
            .category_mut(rent_id)
            .unwrap()
            .expenses
            .push(Expense::new("June rent", dec!(1200), Utc::now()));

        let payload = MonthBudgetPayload {
            starting_credit_card_debt: Some(dec!(640)),
            categories: Some(vec![
                CategoryPayload {
                    id: Some(rent_id),
                    name: "Rent".into(),
                    budgeted_amount: dec!(1200),
                    ..CategoryPayload::default()
                },
                CategoryPayload {
                    name: "groceries".into(),
                    budgeted_amount: dec!(300),
                    ..CategoryPayload::default()
                },
            ]),
        };
        let groceries_id = named(&month, "Groceries").id;
        BudgetService::apply_payload(&mut month, payload).unwrap();
        normalize_month(&mut month);

        assert_eq!(month.starting_credit_card_debt, dec!(640));
        let rent = month.category(rent_id).unwrap();
        assert_eq!(rent.name, "Rent");
        assert_eq!(rent.expenses.len(), 1);
        assert!(month.category(groceries_id).is_some());
        assert!(month.savings().is_some());
        assert!(month.credit_card_payments().is_some());
    }

    #[test]
    fn invalid_payload_leaves_month_untouched() {
        let mut month = month("2025-06");
        let before = month.clone();
        let payload = MonthBudgetPayload {
            starting_credit_card_debt: Some(dec!(-5)),
            categories: None,
        };
        assert!(BudgetService::apply_payload(&mut month, payload).is_err());
        let payload = MonthBudgetPayload {
            starting_credit_card_debt: None,
            categories: Some(vec![CategoryPayload::default()]),
        };
        assert!(BudgetService::apply_payload(&mut month, payload).is_err());
        assert_eq!(month, before);
    }

    #[test]
    fn payload_cannot_rename_or_nest_system_categories() {
        let mut month = month("2025-06");
        let savings_id = month.savings().unwrap().id;
        let payload = MonthBudgetPayload {
            starting_credit_card_debt: None,
            categories: Some(vec![CategoryPayload {
                id: Some(savings_id),
                name: "Vacation".into(),
                budgeted_amount: dec!(400),
                subcategories: Some(vec![SubCategoryPayload {
                    name: "Beach".into(),
                    budgeted_amount: dec!(50),
                    ..SubCategoryPayload::default()
                }]),
                ..CategoryPayload::default()
            }]),
        };
        BudgetService::apply_payload(&mut month, payload).unwrap();

        let savings = month.category(savings_id).unwrap();
        assert_eq!(savings.name, SAVINGS);
        assert!(savings.is_system_category);
        assert!(savings.subcategories.is_empty());
        assert_eq!(savings.budgeted_amount, dec!(400));
        assert!(month.credit_card_payments().is_some());
        assert!(!normalize_month(&mut month));
    }

    #[test]
    fn payload_entries_claim_distinct_categories() {
        let mut month = month("2025-06");
        let groceries_id = named(&month, "Groceries").id;
        let duplicate_names = MonthBudgetPayload {
            starting_credit_card_debt: None,
            categories: Some(vec![
                CategoryPayload {
                    name: "Groceries".into(),
                    ..CategoryPayload::default()
                },
                CategoryPayload {
                    name: " groceries".into(),
                    ..CategoryPayload::default()
                },
            ]),
        };
        assert!(matches!(
            BudgetService::apply_payload(&mut month, duplicate_names),
            Err(ServiceError::Invalid(_))
        ));

        // A name match must not take a category an id already claimed.
        let payload = MonthBudgetPayload {
            starting_credit_card_debt: None,
            categories: Some(vec![
                CategoryPayload {
                    name: "Utilities".into(),
                    ..CategoryPayload::default()
                },
                CategoryPayload {
                    id: Some(groceries_id),
                    name: "Food".into(),
                    ..CategoryPayload::default()
                },
                CategoryPayload {
                    name: "Groceries".into(),
                    ..CategoryPayload::default()
                },
            ]),
        };
        BudgetService::apply_payload(&mut month, payload).unwrap();
        let mut ids: Vec<_> = month.categories.iter().map(|c| c.id).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(month.category(groceries_id).unwrap().name, "Food");
    }

    #[test]
    fn payload_rejects_reserved_names_for_user_categories() {
        let mut month = month("2025-06");
        let before = month.clone();
        let rent_id = named(&month, "Rent/Mortgage").id;
        let payload = MonthBudgetPayload {
            starting_credit_card_debt: None,
            categories: Some(vec![CategoryPayload {
                id: Some(rent_id),
                name: "credit card payments".into(),
                ..CategoryPayload::default()
            }]),
        };
        assert!(matches!(
            BudgetService::apply_payload(&mut month, payload),
            Err(ServiceError::Invalid(_))
        ));
        assert_eq!(month, before);
    }

    #[test]
    fn unspent_total_counts_only_positive_user_leftovers() {
        let mut month = month("2025-06");
        for category in month.categories.iter_mut() {
            match category.name.as_str() {
                "Groceries" => {
                    category.budgeted_amount = dec!(200);
                    category
                        .expenses
                        .push(Expense::new("Shop", dec!(150), Utc::now()));
                }
                "Transport" => {
                    category.budgeted_amount = dec!(20);
                    category
                        .expenses
                        .push(Expense::new("Taxi", dec!(35), Utc::now()));
                }
                SAVINGS => category.budgeted_amount = dec!(500),
                _ => {}
            }
        }
        assert_eq!(BudgetService::unspent_total(&month), dec!(50));
        assert_eq!(BudgetService::rollover(&mut month), dec!(50));
        assert!(month.is_rolled_over);
    }

    #[test]
    fn duplicate_copies_budgets_without_expenses() {
        let mut source = month("2025-06");
        let lunch = SubCategory::new("Lunch", dec!(60));
        let mut category = BudgetCategory::new("Dining", dec!(100));
        category
            .expenses
            .push(Expense::new("Dinner", dec!(40), Utc::now()));
        source.categories.push(category);
        let mut with_subs = BudgetCategory::new("Kids", dec!(0));
        with_subs.subcategories.push(lunch);
        source.categories.push(with_subs);
        normalize_month(&mut source);

        let target = BudgetService::duplicate(&source, id("2025-07"), None);
        let dining = named(&target, "Dining");
        assert_eq!(dining.budgeted_amount, dec!(100));
        assert!(dining.expenses.is_empty());
        assert_eq!(named(&target, "Kids").budgeted_amount, dec!(60));
        assert!(target.incomes.is_empty());
        assert_eq!(target.id, id("2025-07"));
    }

    #[test]
    fn suggested_budget_replaces_user_categories() {
        let mut month = month("2025-08");
        let savings_id = month.savings().unwrap().id;
        let plan = vec![
            SuggestedCategory {
                name: "Housing".into(),
                budgeted_amount: Some(dec!(1500)),
                subcategories: Vec::new(),
            },
            SuggestedCategory {
                name: "Food".into(),
                budgeted_amount: Some(dec!(999)),
                subcategories: vec![
                    SuggestedSubCategory {
                        name: "Groceries".into(),
                        budgeted_amount: Some(dec!(350)),
                    },
                    SuggestedSubCategory {
                        name: "Eating out".into(),
                        budgeted_amount: None,
                    },
                ],
            },
            SuggestedCategory {
                name: "savings".into(),
                budgeted_amount: Some(dec!(400)),
                subcategories: Vec::new(),
            },
            SuggestedCategory {
                name: CREDIT_CARD_PAYMENTS.into(),
                budgeted_amount: None,
                subcategories: Vec::new(),
            },
            SuggestedCategory {
                name: "Fun".into(),
                budgeted_amount: None,
                subcategories: Vec::new(),
            },
        ];
        BudgetService::apply_suggested_budget(&mut month, &plan, Some(dec!(900)), Some(dec!(250)));
        normalize_month(&mut month);

        let names: Vec<_> = month.categories.iter().map(|c| c.name.as_str()).collect();
        assert!(!names.contains(&"Groceries"));
        assert_eq!(month.categories.len(), 5);
        assert_eq!(month.savings().unwrap().id, savings_id);
        assert_eq!(month.savings().unwrap().budgeted_amount, dec!(400));
        assert_eq!(
            month.credit_card_payments().unwrap().budgeted_amount,
            Decimal::ZERO
        );
        assert_eq!(named(&month, "Food").budgeted_amount, dec!(350));
        assert_eq!(named(&month, "Fun").budgeted_amount, Decimal::ZERO);
        assert_eq!(month.starting_credit_card_debt, dec!(650));
    }
}
