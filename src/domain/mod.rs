//! Core domain types and logic.

pub mod asset_values;
pub mod config_validation;
pub mod error;
pub mod heuristics;
pub mod optimization;
pub mod price_table;
pub mod ranking;
pub mod report;
pub mod returns;
pub mod strategy;
pub mod trend;
