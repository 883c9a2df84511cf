//! Roles, actors and the access policy table
//!
//! Every protected operation maps to the roles that may perform it. An actor
//! passes when it is central or holds any one of those roles.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

use crate::types::UnknownVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    KitchenManager,
    WarehouseManager,
    TokenIssuer,
    DeliveryDesk,
    RestaurantManager,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::KitchenManager,
        Role::WarehouseManager,
        Role::TokenIssuer,
        Role::DeliveryDesk,
        Role::RestaurantManager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::KitchenManager => "kitchen_manager",
            Role::WarehouseManager => "warehouse_manager",
            Role::TokenIssuer => "token_issuer",
            Role::DeliveryDesk => "delivery_desk",
            Role::RestaurantManager => "restaurant_manager",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("role", s))
    }
}

/// A protected operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Create ingredients, foods, desserts and BOM lines
    ManageCatalog,
    ViewCatalog,
    PlanMenu,
    UpdateCookStatus,
    ViewMenu,
    RecordStockReceipt,
    RecordStockInspection,
    ViewStock,
    IssueToken,
    ViewTokens,
    MarkTokenReceived,
    CreateSale,
    ViewSales,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::ManageCatalog,
        Operation::ViewCatalog,
        Operation::PlanMenu,
        Operation::UpdateCookStatus,
        Operation::ViewMenu,
        Operation::RecordStockReceipt,
        Operation::RecordStockInspection,
        Operation::ViewStock,
        Operation::IssueToken,
        Operation::ViewTokens,
        Operation::MarkTokenReceived,
        Operation::CreateSale,
        Operation::ViewSales,
    ];

    /// Roles that may perform this operation (any one suffices)
    pub const fn allowed_roles(self) -> &'static [Role] {
        use Role::*;
        match self {
            Operation::ManageCatalog => &[KitchenManager, WarehouseManager],
            Operation::ViewCatalog => &[
                KitchenManager,
                WarehouseManager,
                RestaurantManager,
                TokenIssuer,
                DeliveryDesk,
            ],
            Operation::PlanMenu | Operation::UpdateCookStatus => &[KitchenManager],
            Operation::ViewMenu => &[KitchenManager, RestaurantManager, TokenIssuer, DeliveryDesk],
            Operation::RecordStockReceipt | Operation::RecordStockInspection => {
                &[KitchenManager, WarehouseManager]
            }
            Operation::ViewStock => &[KitchenManager, WarehouseManager, RestaurantManager],
            Operation::IssueToken => &[TokenIssuer],
            Operation::ViewTokens => &[TokenIssuer, DeliveryDesk, RestaurantManager],
            Operation::MarkTokenReceived => &[DeliveryDesk],
            Operation::CreateSale | Operation::ViewSales => &[DeliveryDesk, RestaurantManager],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ManageCatalog => "manage_catalog",
            Operation::ViewCatalog => "view_catalog",
            Operation::PlanMenu => "plan_menu",
            Operation::UpdateCookStatus => "update_cook_status",
            Operation::ViewMenu => "view_menu",
            Operation::RecordStockReceipt => "record_stock_receipt",
            Operation::RecordStockInspection => "record_stock_inspection",
            Operation::ViewStock => "view_stock",
            Operation::IssueToken => "issue_token",
            Operation::ViewTokens => "view_tokens",
            Operation::MarkTokenReceived => "mark_token_received",
            Operation::CreateSale => "create_sale",
            Operation::ViewSales => "view_sales",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not permitted to {operation}")]
pub struct PermissionDenied {
    pub operation: Operation,
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_central: bool,
    pub roles: BTreeSet<Role>,
}

impl Actor {
    pub fn new(user_id: Uuid, is_central: bool, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            user_id,
            is_central,
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn can(&self, operation: Operation) -> bool {
        self.is_central
            || operation
                .allowed_roles()
                .iter()
                .any(|role| self.roles.contains(role))
    }

    pub fn authorize(&self, operation: Operation) -> Result<(), PermissionDenied> {
        if self.can(operation) {
            Ok(())
        } else {
            Err(PermissionDenied { operation })
        }
    }
}
