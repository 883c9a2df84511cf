//! Menu plan lifecycle and capacity arithmetic

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use crate::types::UnknownVariant;

/// Cooking stage of a planned menu batch
///
/// Status only moves forward: `pending -> cooking -> done`. Skipping
/// `cooking` is allowed; moving backwards is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum CookStatus {
    Pending,
    Cooking,
    Done,
}

impl CookStatus {
    pub const ALL: [CookStatus; 3] = [CookStatus::Pending, CookStatus::Cooking, CookStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            CookStatus::Pending => "pending",
            CookStatus::Cooking => "cooking",
            CookStatus::Done => "done",
        }
    }

    /// Check a move from `self` to `next`
    pub fn transition(self, next: CookStatus) -> Result<StatusTransition, InvalidTransition> {
        if next == self {
            return Ok(StatusTransition::Unchanged(self));
        }
        if next < self {
            return Err(InvalidTransition { from: self, to: next });
        }
        Ok(StatusTransition::Advanced { from: self, to: next })
    }
}

impl fmt::Display for CookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CookStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CookStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("cook status", s))
    }
}

/// Outcome of an accepted cook-status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTransition {
    Unchanged(CookStatus),
    Advanced { from: CookStatus, to: CookStatus },
}

impl StatusTransition {
    /// True only for a move from a non-done status into `done`
    pub fn enters_done(&self) -> bool {
        matches!(
            self,
            StatusTransition::Advanced {
                to: CookStatus::Done,
                ..
            }
        )
    }

    pub fn status(&self) -> CookStatus {
        match self {
            StatusTransition::Unchanged(status) => *status,
            StatusTransition::Advanced { to, .. } => *to,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cook status cannot move back from {from} to {to}")]
pub struct InvalidTransition {
    pub from: CookStatus,
    pub to: CookStatus,
}

/// Why a capacity reservation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CapacityError {
    #[error("requested count must be at least 1, got {requested}")]
    InvalidCount { requested: i32 },

    #[error("insufficient capacity: {available} available, {requested} requested")]
    Insufficient { available: i32, requested: i32 },
}

/// Take `requested` servings from `capacity`, returning what remains
pub fn reserve_capacity(capacity: i32, requested: i32) -> Result<i32, CapacityError> {
    if requested < 1 {
        return Err(CapacityError::InvalidCount { requested });
    }
    if capacity < requested {
        return Err(CapacityError::Insufficient {
            available: capacity,
            requested,
        });
    }
    Ok(capacity - requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_moves_are_accepted() {
        use CookStatus::*;
        assert!(Pending.transition(Cooking).is_ok());
        assert!(Cooking.transition(Done).unwrap().enters_done());
        assert!(Pending.transition(Done).unwrap().enters_done());
        assert!(!Pending.transition(Cooking).unwrap().enters_done());
    }

    #[test]
    fn backward_moves_are_rejected() {
        use CookStatus::*;
        assert_eq!(
            Done.transition(Cooking),
            Err(InvalidTransition { from: Done, to: Cooking })
        );
        assert!(Cooking.transition(Pending).is_err());
    }

    #[test]
    fn repeating_done_does_not_enter_done_again() {
        let t = CookStatus::Done.transition(CookStatus::Done).unwrap();
        assert_eq!(t, StatusTransition::Unchanged(CookStatus::Done));
        assert!(!t.enters_done());
    }

    #[test]
    fn reserve_capacity_exact_and_short() {
        assert_eq!(reserve_capacity(50, 10), Ok(40));
        assert_eq!(reserve_capacity(40, 40), Ok(0));
        assert_eq!(
            reserve_capacity(40, 45),
            Err(CapacityError::Insufficient {
                available: 40,
                requested: 45
            })
        );
        assert_eq!(
            reserve_capacity(40, 0),
            Err(CapacityError::InvalidCount { requested: 0 })
        );
    }
}
