//! Food and ingredient categories
//!
//! Every ingredient and food carries a category and a subcategory. The
//! subcategory must be one the category allows; the allowed sets are a fixed
//! table checked at compile time.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::types::UnknownVariant;

/// Top-level category of a food or ingredient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Regular menu served to staff and guests, sold over the counter
    Normal,
    /// Charitable menu issued against vouchers (tokens)
    Hazrati,
}

/// Subcategory, always owned by exactly one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "VARCHAR", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Subcategory {
    Staff,
    Guest,
    Needy,
    Pilgrim,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Normal, Category::Hazrati];

    /// Subcategories this category accepts
    pub const fn allowed_subcategories(self) -> &'static [Subcategory] {
        match self {
            Category::Normal => &[Subcategory::Staff, Subcategory::Guest],
            Category::Hazrati => &[Subcategory::Needy, Subcategory::Pilgrim],
        }
    }

    pub fn allows(self, subcategory: Subcategory) -> bool {
        self.allowed_subcategories().contains(&subcategory)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Normal => "normal",
            Category::Hazrati => "hazrati",
        }
    }
}

impl Subcategory {
    pub const ALL: [Subcategory; 4] = [
        Subcategory::Staff,
        Subcategory::Guest,
        Subcategory::Needy,
        Subcategory::Pilgrim,
    ];

    /// The category that owns this subcategory
    pub const fn category(self) -> Category {
        match self {
            Subcategory::Staff | Subcategory::Guest => Category::Normal,
            Subcategory::Needy | Subcategory::Pilgrim => Category::Hazrati,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subcategory::Staff => "staff",
            Subcategory::Guest => "guest",
            Subcategory::Needy => "needy",
            Subcategory::Pilgrim => "pilgrim",
        }
    }
}

// The allowed-subcategory table and `Subcategory::category` must agree.
const fn category_table_is_consistent() -> bool {
    let categories = Category::ALL;
    let mut i = 0;
    while i < categories.len() {
        let subcategories = categories[i].allowed_subcategories();
        let mut j = 0;
        while j < subcategories.len() {
            if subcategories[j].category() as u8 != categories[i] as u8 {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(category_table_is_consistent());

/// A validated category/subcategory pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryPair {
    pub category: Category,
    pub subcategory: Subcategory,
}

impl CategoryPair {
    /// Build a pair, returning `None` when the subcategory belongs elsewhere
    pub fn new(category: Category, subcategory: Subcategory) -> Option<Self> {
        category.allows(subcategory).then_some(Self {
            category,
            subcategory,
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Subcategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CategoryPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.subcategory)
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("category", s))
    }
}

impl FromStr for Subcategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subcategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("subcategory", s))
    }
}
