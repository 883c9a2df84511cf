//! Shared types and rules for the Kitchen Operations Platform
//!
//! This crate holds the domain vocabulary (categories, meal slots, cook status,
//! roles) and the pure rules the backend applies inside its transactions:
//! capacity arithmetic, consumption planning, stock movements, reconciliation
//! figures and the access policy table.

pub mod calendar;
pub mod codes;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
