//! Catalog read models shared by the BOM resolver and consumption planning

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Unit;

/// One resolved bill-of-materials line: how much of an ingredient a single
/// serving of a food needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BomRequirement {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub amount_per_serving: i32,
    pub unit: Unit,
}
