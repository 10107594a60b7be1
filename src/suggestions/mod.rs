//! Contract for the external assistant that proposes expenses and budget
//! plans. The core only consumes the structured output; prompting and document
//! parsing live with the provider.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Failure reported by a suggestion provider, passed to callers unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SuggestionError {
    #[error("Suggestion provider error: {0}")]
    Provider(String),
    #[error("Suggestion provider returned an unusable payload: {0}")]
    Payload(String),
}

/// A category the provider may assign expenses to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub id: Uuid,
    pub name: String,
}

/// Document handed to the provider (receipt photo, statement export, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionDocument {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

/// One expense the provider read from a document. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedExpense {
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedSubCategory {
    pub name: String,
    #[serde(default)]
    pub budgeted_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedCategory {
    pub name: String,
    #[serde(default)]
    pub budgeted_amount: Option<Decimal>,
    #[serde(default)]
    pub subcategories: Vec<SuggestedSubCategory>,
}

/// A proposed category tree with the provider's free-text advice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetPlan {
    #[serde(default)]
    pub categories: Vec<SuggestedCategory>,
    #[serde(default)]
    pub advice: String,
}

/// Inputs for a budget plan request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetPlanRequest {
    pub goals: String,
    pub documents: Vec<SuggestionDocument>,
    pub income: Option<Decimal>,
    pub prior_debt: Option<Decimal>,
    pub prior_credit_card_payment: Option<Decimal>,
}

/// External assistant. Calls may be slow; any timeout belongs to the provider.
pub trait SuggestionProvider: Send + Sync {
    fn suggest_expenses(
        &self,
        document: &SuggestionDocument,
        options: &[CategoryOption],
    ) -> Result<Vec<SuggestedExpense>, SuggestionError>;

    fn suggest_budget(&self, request: &BudgetPlanRequest) -> Result<BudgetPlan, SuggestionError>;
}
