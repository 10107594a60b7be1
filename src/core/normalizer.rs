//! Repairs that keep every month well formed: the reserved system categories
//! and the budgets derived from subcategories.

use std::mem;

use rust_decimal::Decimal;
use tracing::debug;

use crate::domain::{
    category::reserved_name, BudgetCategory, BudgetMonth, RESERVED_CATEGORY_NAMES,
};

/// Guarantees exactly one well-formed category per reserved name.
///
/// The first case-insensitive match for a reserved name is promoted to a system
/// category with canonical casing and no subcategories (their expenses are
/// folded into the category). Later matches are merged into the first one. A
/// missing reserved category is appended with a zero budget. Returns the
/// repaired list and whether anything changed; a second pass never changes.
pub fn normalize_system_categories(
    categories: Vec<BudgetCategory>,
) -> (Vec<BudgetCategory>, bool) {
    let mut changed = false;
    let mut result: Vec<BudgetCategory> = Vec::with_capacity(categories.len() + 2);
    let mut canonical_index: [Option<usize>; 2] = [None, None];

    for mut category in categories {
        let slot = reserved_name(&category.name).and_then(|name| {
            RESERVED_CATEGORY_NAMES
                .iter()
                .position(|reserved| *reserved == name)
        });
        let Some(slot) = slot else {
            if category.is_system_category {
                debug!(name = %category.name, "demoting unknown system category");
                category.is_system_category = false;
                changed = true;
            }
            result.push(category);
            continue;
        };

        let canonical = RESERVED_CATEGORY_NAMES[slot];
        changed |= promote_to_system(&mut category, canonical);
        match canonical_index[slot] {
            Some(index) => {
                debug!(name = canonical, "merging duplicate system category");
                let target = &mut result[index];
                target.expenses.append(&mut category.expenses);
                changed = true;
            }
            None => {
                canonical_index[slot] = Some(result.len());
                result.push(category);
            }
        }
    }

    for (slot, canonical) in RESERVED_CATEGORY_NAMES.iter().enumerate() {
        if canonical_index[slot].is_none() {
            debug!(name = canonical, "adding missing system category");
            result.push(BudgetCategory::system(canonical, Decimal::ZERO));
            changed = true;
        }
    }

    (result, changed)
}

fn promote_to_system(category: &mut BudgetCategory, canonical: &str) -> bool {
    let mut changed = false;
    if !category.is_system_category {
        category.is_system_category = true;
        changed = true;
    }
    if category.name != canonical {
        category.name = canonical.to_string();
        changed = true;
    }
    if category.has_subcategories() {
        for mut sub in mem::take(&mut category.subcategories) {
            category.expenses.append(&mut sub.expenses);
        }
        changed = true;
    }
    changed
}

/// Recomputes the budget of every non-system category that has subcategories.
pub fn sync_derived_budgets(categories: &mut [BudgetCategory]) -> bool {
    let mut changed = false;
    for category in categories
        .iter_mut()
        .filter(|category| !category.is_system_category && category.has_subcategories())
    {
        let derived = category.subcategory_budget_total();
        if category.budgeted_amount != derived {
            category.budgeted_amount = derived;
            changed = true;
        }
    }
    changed
}

/// Applies every structural repair to a month in place. Returns `true` when
/// the month differed from its well-formed shape.
pub fn normalize_month(month: &mut BudgetMonth) -> bool {
    let mut changed = false;
    if month.year != month.id.year() || month.month != month.id.month() {
        month.year = month.id.year();
        month.month = month.id.month();
        changed = true;
    }
    if month.starting_credit_card_debt < Decimal::ZERO {
        month.starting_credit_card_debt = Decimal::ZERO;
        changed = true;
    }
    let (categories, categories_changed) =
        normalize_system_categories(mem::take(&mut month.categories));
    month.categories = categories;
    changed |= categories_changed;
    changed |= sync_derived_budgets(&mut month.categories);
    changed
}
