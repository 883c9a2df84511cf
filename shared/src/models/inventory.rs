//! Stock movement arithmetic, consumption planning and reconciliation figures

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::BomRequirement;
use crate::types::Unit;

/// A change applied to an ingredient's stock level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockMovement {
    /// Goods received; adds to the total
    Receipt(Decimal),
    /// Kitchen usage; subtracts, never below zero
    Consumption(Decimal),
    /// Physical count; replaces the total
    Inspection(Decimal),
}

/// Result of applying a [`StockMovement`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMovement {
    pub total: Decimal,
    /// Amount of a consumption that could not be covered by stock
    pub shortfall: Option<Decimal>,
}

/// Compute the new stock total for a movement
pub fn apply_movement(current: Decimal, movement: StockMovement) -> AppliedMovement {
    match movement {
        StockMovement::Receipt(amount) => AppliedMovement {
            total: current + amount,
            shortfall: None,
        },
        StockMovement::Inspection(actual) => AppliedMovement {
            total: actual,
            shortfall: None,
        },
        StockMovement::Consumption(amount) => {
            let remaining = current - amount;
            if remaining < Decimal::ZERO {
                AppliedMovement {
                    total: Decimal::ZERO,
                    shortfall: Some(-remaining),
                }
            } else {
                AppliedMovement {
                    total: remaining,
                    shortfall: None,
                }
            }
        }
    }
}

/// A consumption record to be written for one BOM line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumptionLine {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub consumed_amount: Decimal,
    pub unit: Unit,
}

/// Expand BOM lines into the consumption a batch of `capacity` servings posts
pub fn plan_consumption(bom: &[BomRequirement], capacity: i32) -> Vec<ConsumptionLine> {
    bom.iter()
        .map(|line| ConsumptionLine {
            ingredient_id: line.ingredient_id,
            ingredient_name: line.ingredient_name.clone(),
            consumed_amount: Decimal::from(line.amount_per_serving) * Decimal::from(capacity),
            unit: line.unit,
        })
        .collect()
}

/// A consumption that was floored at zero stock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockClamp {
    pub ingredient_id: Uuid,
    pub ingredient: String,
    pub requested: Decimal,
    pub available: Decimal,
}

pub fn is_low_stock(total: Decimal, warning_amount: Decimal) -> bool {
    total <= warning_amount
}

/// Reconciliation figures for one ingredient as of a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationFigures {
    pub predicted_consumption: Decimal,
    pub actual_consumption: Decimal,
    pub current_stock: Option<Decimal>,
    pub previous_stock: Option<Decimal>,
    /// `actual - predicted`
    pub variance: Decimal,
    /// `current - previous`, when both inspections exist
    pub inspected_change: Option<Decimal>,
}

impl ReconciliationFigures {
    pub fn new(
        predicted_consumption: Decimal,
        actual_consumption: Decimal,
        current_stock: Option<Decimal>,
        previous_stock: Option<Decimal>,
    ) -> Self {
        let inspected_change = match (current_stock, previous_stock) {
            (Some(current), Some(previous)) => Some(current - previous),
            _ => None,
        };
        Self {
            predicted_consumption,
            actual_consumption,
            current_stock,
            previous_stock,
            variance: actual_consumption - predicted_consumption,
            inspected_change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumption_clamps_at_zero() {
        let applied = apply_movement(Decimal::from(5000), StockMovement::Consumption(Decimal::from(8000)));
        assert_eq!(applied.total, Decimal::ZERO);
        assert_eq!(applied.shortfall, Some(Decimal::from(3000)));
    }

    #[test]
    fn exact_consumption_leaves_zero_without_shortfall() {
        let applied = apply_movement(Decimal::from(40), StockMovement::Consumption(Decimal::from(40)));
        assert_eq!(applied.total, Decimal::ZERO);
        assert_eq!(applied.shortfall, None);
    }

    #[test]
    fn inspection_overwrites() {
        let applied = apply_movement(Decimal::from(123), StockMovement::Inspection(Decimal::from(7)));
        assert_eq!(applied.total, Decimal::from(7));
    }

    #[test]
    fn plan_consumption_multiplies_by_capacity() {
        let bom = vec![BomRequirement {
            ingredient_id: Uuid::new_v4(),
            ingredient_name: "Rice".into(),
            amount_per_serving: 200,
            unit: Unit::G,
        }];
        let lines = plan_consumption(&bom, 40);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].consumed_amount, Decimal::from(8000));
    }

    #[test]
    fn reconciliation_derives_variance_and_change() {
        let figures = ReconciliationFigures::new(
            Decimal::from(100),
            Decimal::from(90),
            Some(Decimal::from(50)),
            Some(Decimal::from(140)),
        );
        assert_eq!(figures.variance, Decimal::from(-10));
        assert_eq!(figures.inspected_change, Some(Decimal::from(-90)));

        let no_previous = ReconciliationFigures::new(Decimal::ZERO, Decimal::ZERO, Some(Decimal::ONE), None);
        assert_eq!(no_previous.inspected_change, None);
    }

    #[test]
    fn low_stock_includes_the_threshold() {
        assert!(is_low_stock(Decimal::from(10), Decimal::from(10)));
        assert!(!is_low_stock(Decimal::from(11), Decimal::from(10)));
    }
}
