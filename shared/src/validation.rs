//! Validation rules for catalog entries, BOM lines and issuance line items
//!
//! These are pure functions; the backend calls them before writing and maps a
//! [`RuleViolation`] onto its HTTP error.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{Category, CategoryPair, IssuanceKind, Subcategory};

/// A domain rule that rejected a write
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    #[error("subcategory {subcategory} does not belong to category {category}")]
    SubcategoryNotAllowed {
        category: Category,
        subcategory: Subcategory,
    },

    #[error("ingredient {ingredient} is {actual}, but the food is {expected}")]
    CategoryMismatch {
        ingredient: String,
        actual: CategoryPair,
        expected: CategoryPair,
    },

    #[error("food {food} is {actual}; a {kind} only accepts {required} foods")]
    WrongIssuanceCategory {
        food: String,
        kind: IssuanceKind,
        actual: Category,
        required: Category,
    },

    #[error("food {food} is in subcategory {actual}, but {selected} was selected")]
    SubcategoryMismatch {
        food: String,
        actual: Subcategory,
        selected: Subcategory,
    },

    #[error("{field} must not be negative")]
    Negative { field: &'static str },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

impl RuleViolation {
    /// Name of the input field the violation points at
    pub fn field(&self) -> &'static str {
        match self {
            RuleViolation::SubcategoryNotAllowed { .. } => "subcategory",
            RuleViolation::CategoryMismatch { .. } => "ingredient",
            RuleViolation::WrongIssuanceCategory { .. }
            | RuleViolation::SubcategoryMismatch { .. } => "foods",
            RuleViolation::Negative { field } | RuleViolation::NotPositive { field } => *field,
        }
    }
}

/// Validate that the subcategory belongs to the category
pub fn validate_category_pair(
    category: Category,
    subcategory: Subcategory,
) -> Result<CategoryPair, RuleViolation> {
    CategoryPair::new(category, subcategory).ok_or(RuleViolation::SubcategoryNotAllowed {
        category,
        subcategory,
    })
}

/// Validate a BOM line: the ingredient must share the food's category and
/// subcategory, and the per-serving amount must not be negative
pub fn validate_bom_line(
    ingredient_name: &str,
    ingredient: CategoryPair,
    food: CategoryPair,
    amount_per_serving: i32,
) -> Result<(), RuleViolation> {
    if amount_per_serving < 0 {
        return Err(RuleViolation::Negative {
            field: "amount_per_serving",
        });
    }
    if ingredient != food {
        return Err(RuleViolation::CategoryMismatch {
            ingredient: ingredient_name.to_string(),
            actual: ingredient,
            expected: food,
        });
    }
    Ok(())
}

/// Validate that a food may be issued by a sale or token under the selected subcategory
pub fn validate_issuance_food(
    kind: IssuanceKind,
    selected: Subcategory,
    food_title: &str,
    food: CategoryPair,
) -> Result<(), RuleViolation> {
    let required = kind.required_category();
    if food.category != required {
        return Err(RuleViolation::WrongIssuanceCategory {
            food: food_title.to_string(),
            kind,
            actual: food.category,
            required,
        });
    }
    if food.subcategory != selected {
        return Err(RuleViolation::SubcategoryMismatch {
            food: food_title.to_string(),
            actual: food.subcategory,
            selected,
        });
    }
    Ok(())
}

/// Validate that a decimal amount is zero or more
pub fn validate_non_negative(field: &'static str, value: Decimal) -> Result<(), RuleViolation> {
    if value < Decimal::ZERO {
        return Err(RuleViolation::Negative { field });
    }
    Ok(())
}

/// Validate that a decimal amount is strictly positive
pub fn validate_positive(field: &'static str, value: Decimal) -> Result<(), RuleViolation> {
    if value <= Decimal::ZERO {
        return Err(RuleViolation::NotPositive { field });
    }
    Ok(())
}
