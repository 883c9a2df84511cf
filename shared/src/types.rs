//! Common value types used across the platform

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Returned when a stored or submitted string names no known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Meal slot served by a menu plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("meal slot", s))
    }
}

/// Unit of measure for ingredients and stock movements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kg,
    G,
    Mg,
    Ton,
    L,
    Ml,
    Cup,
    Tbsp,
    Tsp,
    Pcs,
    Pack,
    Carton,
    Dozen,
    Set,
    Tray,
    Bag,
}

impl Unit {
    pub const ALL: [Unit; 16] = [
        Unit::Kg,
        Unit::G,
        Unit::Mg,
        Unit::Ton,
        Unit::L,
        Unit::Ml,
        Unit::Cup,
        Unit::Tbsp,
        Unit::Tsp,
        Unit::Pcs,
        Unit::Pack,
        Unit::Carton,
        Unit::Dozen,
        Unit::Set,
        Unit::Tray,
        Unit::Bag,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::Mg => "mg",
            Unit::Ton => "ton",
            Unit::L => "l",
            Unit::Ml => "ml",
            Unit::Cup => "cup",
            Unit::Tbsp => "tbsp",
            Unit::Tsp => "tsp",
            Unit::Pcs => "pcs",
            Unit::Pack => "pack",
            Unit::Carton => "carton",
            Unit::Dozen => "dozen",
            Unit::Set => "set",
            Unit::Tray => "tray",
            Unit::Bag => "bag",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Unit {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::ALL
            .into_iter()
            .find(|unit| unit.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("unit", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_slot_round_trips_through_str() {
        for slot in MealSlot::ALL {
            assert_eq!(slot.as_str().parse::<MealSlot>().unwrap(), slot);
        }
        assert!("brunch".parse::<MealSlot>().is_err());
    }

    #[test]
    fn unit_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Unit::Tbsp).unwrap(), "\"tbsp\"");
        assert_eq!("carton".parse::<Unit>().unwrap(), Unit::Carton);
    }
}
