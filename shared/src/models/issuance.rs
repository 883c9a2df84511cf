//! Sales and tokens: the two ways a planned meal is issued

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::Category;
use crate::types::{MealSlot, UnknownVariant};

/// Which issuance document is reserving capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuanceKind {
    /// Over-the-counter sale of the regular menu
    Sale,
    /// Meal voucher for the charitable menu
    Token,
}

impl IssuanceKind {
    /// Category every food on this kind of document must belong to
    pub const fn required_category(self) -> Category {
        match self {
            IssuanceKind::Sale => Category::Normal,
            IssuanceKind::Token => Category::Hazrati,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssuanceKind::Sale => "sale",
            IssuanceKind::Token => "token",
        }
    }
}

impl fmt::Display for IssuanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery state of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum TokenStatus {
    Pending,
    Received,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Received => "received",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TokenStatus::Pending),
            "received" => Ok(TokenStatus::Received),
            other => Err(UnknownVariant::new("token status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    #[error("food {food} is not offered in any meal slot")]
    NoSlots { food: String },

    #[error("food {food} is offered in several meal slots; choose one")]
    Ambiguous { food: String },

    #[error("food {food} is not offered for {requested}")]
    NotOffered { food: String, requested: MealSlot },
}

/// Pick the meal slot a line item reserves from
///
/// An explicit slot must be one the food is offered in. Without one, the slot
/// is inferred only when the food has exactly one.
pub fn resolve_meal_slot(
    food: &str,
    offered: &[MealSlot],
    requested: Option<MealSlot>,
) -> Result<MealSlot, SlotError> {
    match (requested, offered) {
        (Some(slot), _) if offered.contains(&slot) => Ok(slot),
        (Some(slot), _) => Err(SlotError::NotOffered {
            food: food.to_string(),
            requested: slot,
        }),
        (None, [only]) => Ok(*only),
        (None, []) => Err(SlotError::NoSlots {
            food: food.to_string(),
        }),
        (None, _) => Err(SlotError::Ambiguous {
            food: food.to_string(),
        }),
    }
}

pub fn line_total(unit_price: Decimal, count: i32) -> Decimal {
    unit_price * Decimal::from(count)
}

/// Sum of unit price times count over every line
pub fn order_total<I>(lines: I) -> Decimal
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines
        .into_iter()
        .map(|(price, count)| line_total(price, count))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn kind_maps_to_category() {
        assert_eq!(IssuanceKind::Sale.required_category(), Category::Normal);
        assert_eq!(IssuanceKind::Token.required_category(), Category::Hazrati);
    }

    #[test]
    fn single_slot_is_inferred() {
        assert_eq!(
            resolve_meal_slot("Soup", &[MealSlot::Lunch], None),
            Ok(MealSlot::Lunch)
        );
    }

    #[test]
    fn multiple_slots_need_a_choice() {
        let offered = [MealSlot::Lunch, MealSlot::Dinner];
        assert!(matches!(
            resolve_meal_slot("Soup", &offered, None),
            Err(SlotError::Ambiguous { .. })
        ));
        assert_eq!(
            resolve_meal_slot("Soup", &offered, Some(MealSlot::Dinner)),
            Ok(MealSlot::Dinner)
        );
        assert!(matches!(
            resolve_meal_slot("Soup", &offered, Some(MealSlot::Breakfast)),
            Err(SlotError::NotOffered { .. })
        ));
    }

    #[test]
    fn totals_multiply_price_by_count() {
        let total = order_total([(dec("12.50"), 2), (dec("3"), 3)]);
        assert_eq!(total, dec("34.00"));
        assert_eq!(order_total(std::iter::empty()), Decimal::ZERO);
    }
}
