use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{category::reserved_name, BudgetCategory, BudgetMonth, SubCategory};

use super::{require_name, require_non_negative, ServiceError, ServiceResult};

/// Partial update of a category. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub budgeted_amount: Option<Decimal>,
}

/// Partial update of a subcategory. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubCategoryPatch {
    pub name: Option<String>,
    pub budgeted_amount: Option<Decimal>,
}

pub struct CategoryService;

impl CategoryService {
    pub fn add(month: &mut BudgetMonth, name: &str) -> ServiceResult<Uuid> {
        let name = Self::validate_name(month, None, name)?;
        let category = BudgetCategory::new(name, Decimal::ZERO);
        let id = category.id;
        month.categories.push(category);
        Ok(id)
    }

    /// System categories accept only a new budget. User categories accept a
    /// new name, and a new budget while they have no subcategories.
    pub fn edit(month: &mut BudgetMonth, id: Uuid, patch: CategoryPatch) -> ServiceResult<()> {
        let existing = month
            .category(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Category {id}")))?;
        let is_system = existing.is_system_category;
        let has_subcategories = existing.has_subcategories();

        let name = match patch.name {
            Some(_) if is_system => {
                debug!(%id, "ignoring rename of system category");
                None
            }
            Some(name) => Some(Self::validate_name(month, Some(id), &name)?),
            None => None,
        };
        let budget = match patch.budgeted_amount {
            Some(_) if !is_system && has_subcategories => {
                debug!(%id, "ignoring budget of category derived from subcategories");
                None
            }
            Some(amount) => Some(require_non_negative(amount, "Budgeted amount")?),
            None => None,
        };

        let Some(category) = month.category_mut(id) else {
            return Err(ServiceError::NotFound(format!("Category {id}")));
        };
        if let Some(name) = name {
            category.name = name;
        }
        if let Some(amount) = budget {
            category.budgeted_amount = amount;
        }
        Ok(())
    }

    /// Removes a user category. System categories are kept; returns whether
    /// anything was removed.
    pub fn remove(month: &mut BudgetMonth, id: Uuid) -> ServiceResult<bool> {
        let category = month
            .category(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Category {id}")))?;
        if category.is_system_category {
            debug!(%id, name = %category.name, "refusing to delete system category");
            return Ok(false);
        }
        month.categories.retain(|category| category.id != id);
        Ok(true)
    }

    pub fn add_subcategory(
        month: &mut BudgetMonth,
        parent_id: Uuid,
        name: &str,
        budgeted_amount: Decimal,
    ) -> ServiceResult<Uuid> {
        let budgeted_amount = require_non_negative(budgeted_amount, "Budgeted amount")?;
        let parent = Self::user_parent_mut(month, parent_id)?;
        let name = Self::validate_subcategory_name(parent, None, name)?;
        let sub = SubCategory::new(name, budgeted_amount);
        let id = sub.id;
        parent.subcategories.push(sub);
        recompute_parent_budget(parent);
        Ok(id)
    }

    pub fn edit_subcategory(
        month: &mut BudgetMonth,
        parent_id: Uuid,
        sub_id: Uuid,
        patch: SubCategoryPatch,
    ) -> ServiceResult<()> {
        let parent = Self::user_parent_mut(month, parent_id)?;
        if parent.subcategory(sub_id).is_none() {
            return Err(ServiceError::NotFound(format!("Subcategory {sub_id}")));
        }
        let name = patch
            .name
            .map(|name| Self::validate_subcategory_name(parent, Some(sub_id), &name))
            .transpose()?;
        let budget = patch
            .budgeted_amount
            .map(|amount| require_non_negative(amount, "Budgeted amount"))
            .transpose()?;

        if let Some(sub) = parent.subcategory_mut(sub_id) {
            if let Some(name) = name {
                sub.name = name;
            }
            if let Some(amount) = budget {
                sub.budgeted_amount = amount;
            }
        }
        recompute_parent_budget(parent);
        Ok(())
    }

    pub fn remove_subcategory(
        month: &mut BudgetMonth,
        parent_id: Uuid,
        sub_id: Uuid,
    ) -> ServiceResult<()> {
        let parent = Self::user_parent_mut(month, parent_id)?;
        let before = parent.subcategories.len();
        parent.subcategories.retain(|sub| sub.id != sub_id);
        if parent.subcategories.len() == before {
            return Err(ServiceError::NotFound(format!("Subcategory {sub_id}")));
        }
        recompute_parent_budget(parent);
        Ok(())
    }

    fn user_parent_mut(
        month: &mut BudgetMonth,
        parent_id: Uuid,
    ) -> ServiceResult<&mut BudgetCategory> {
        let parent = month
            .category_mut(parent_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Category {parent_id}")))?;
        if parent.is_system_category {
            return Err(ServiceError::Invalid(format!(
                "System category `{}` cannot have subcategories",
                parent.name
            )));
        }
        Ok(parent)
    }

    fn validate_name(
        month: &BudgetMonth,
        exclude: Option<Uuid>,
        candidate: &str,
    ) -> ServiceResult<String> {
        let name = require_name(candidate, "Category name")?;
        if let Some(reserved) = reserved_name(&name) {
            return Err(ServiceError::Invalid(format!(
                "`{reserved}` is a reserved category name"
            )));
        }
        let duplicate = month.categories.iter().any(|category| {
            category.name.trim().eq_ignore_ascii_case(&name)
                && exclude.map_or(true, |id| category.id != id)
        });
        if duplicate {
            return Err(ServiceError::Invalid(format!(
                "Category `{name}` already exists"
            )));
        }
        Ok(name)
    }

    fn validate_subcategory_name(
        parent: &BudgetCategory,
        exclude: Option<Uuid>,
        candidate: &str,
    ) -> ServiceResult<String> {
        let name = require_name(candidate, "Subcategory name")?;
        let duplicate = parent.subcategories.iter().any(|sub| {
            sub.name.trim().eq_ignore_ascii_case(&name) && exclude.map_or(true, |id| sub.id != id)
        });
        if duplicate {
            return Err(ServiceError::Invalid(format!(
                "Subcategory `{name}` already exists in `{}`",
                parent.name
            )));
        }
        Ok(name)
    }
}

/// A parent with subcategories budgets exactly their sum. Removing the last
/// subcategory leaves the last derived figure in place for the user to edit.
fn recompute_parent_budget(parent: &mut BudgetCategory) {
    if !parent.is_system_category && parent.has_subcategories() {
        parent.budgeted_amount = parent.subcategory_budget_total();
    }
}
