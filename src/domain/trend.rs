//! Multi-horizon trend classifier.

use crate::domain::error::PortfolioError;
use crate::domain::price_table::PriceTable;
use crate::domain::returns::{Lookback, period_returns};
use tracing::debug;

pub const DEFAULT_HORIZONS: [u32; 3] = [1, 6, 12];

/// Disjoint buy/sell sets in table asset order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrendSignal {
    pub buy: Vec<String>,
    pub sell: Vec<String>,
}

/// Classify each asset by the mean of its average returns over
/// `horizons_months`. Horizons where the asset has no return are left out of
/// the mean rather than counted as zero. Mean > 0 is a buy, anything else a
/// sell.
pub fn trend(prices: &PriceTable, horizons_months: &[u32]) -> Result<TrendSignal, PortfolioError> {
    if horizons_months.is_empty() {
        return Err(PortfolioError::invalid_config(
            "trend",
            "horizons",
            "at least one horizon is required",
        ));
    }

    let per_horizon = horizons_months
        .iter()
        .map(|&m| period_returns(prices, Lookback::Months(m)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut signal = TrendSignal::default();
    for asset in prices.assets() {
        let values: Vec<f64> = per_horizon
            .iter()
            .filter_map(|scores| scores.get(asset).copied())
            .collect();
        if values.is_empty() {
            return Err(PortfolioError::MissingAssetData {
                asset: asset.clone(),
                reason: "no returns in any horizon".into(),
            });
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        if mean > 0.0 {
            signal.buy.push(asset.clone());
        } else {
            signal.sell.push(asset.clone());
        }
    }

    debug!(
        horizons = ?horizons_months,
        buy = signal.buy.len(),
        sell = signal.sell.len(),
        "trend classified"
    );
    Ok(signal)
}
