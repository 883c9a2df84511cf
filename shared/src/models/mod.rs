//! Domain models for the Kitchen Operations Platform

mod access;
mod catalog;
mod category;
mod inventory;
mod issuance;
mod menu;

pub use access::*;
pub use catalog::*;
pub use category::*;
pub use inventory::*;
pub use issuance::*;
pub use menu::*;
