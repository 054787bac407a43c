//! Price data port trait.

use crate::domain::error::PortfolioError;
use crate::domain::price_table::PriceTable;

/// Supplies the price table a computation runs on.
pub trait PricePort {
    fn load_prices(&self) -> Result<PriceTable, PortfolioError>;
}
