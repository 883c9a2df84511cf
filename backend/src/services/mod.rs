//! Business logic services for the Kitchen Operations Platform

pub mod artifacts;
pub mod bom;
pub mod capacity;
pub mod catalog;
pub mod consumption;
pub mod issuance;
pub mod menu;
pub mod stock;
pub mod unit_of_work;

pub use bom::BomService;
pub use catalog::CatalogService;
pub use consumption::ConsumptionPoster;
pub use issuance::IssuanceService;
pub use menu::MenuService;
pub use stock::StockService;

#[cfg(test)]
mod tests;
