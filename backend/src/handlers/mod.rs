//! HTTP handlers for the Kitchen Operations Platform
//!
//! Every protected handler checks the access policy before touching a service.

pub mod catalog;
pub mod health;
pub mod issuance;
pub mod menu;
pub mod stock;

pub use catalog::*;
pub use health::*;
pub use issuance::*;
pub use menu::*;
pub use stock::*;
