//! Rank-based and baseline allocators.
//!
//! Long/short books (momentum, value, short-term reversal) are
//! dollar-neutral. Baselines (equal weight, random, min-volatility) sum to 1.

use crate::domain::asset_values::WeightVector;
use crate::domain::error::PortfolioError;
use crate::domain::price_table::PriceTable;
use crate::domain::ranking::{demeaned_weight, long_short_split, normalized_weight, rank};
use crate::domain::returns::{compounded_returns, latest_month_returns, simple_returns};
use rand::Rng;

/// Days skipped at the end of the momentum window (the most recent month).
pub const MOMENTUM_SKIP_DAYS: usize = 30;

/// Long the strongest compounded performers, short the weakest.
///
/// Scores are compounded over `lookback_days - 30` complete return rows.
pub fn momentum(
    prices: &PriceTable,
    lookback_days: usize,
    top_fraction: f64,
) -> Result<WeightVector, PortfolioError> {
    if lookback_days <= MOMENTUM_SKIP_DAYS {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "lookback_days",
            format!("momentum needs more than {MOMENTUM_SKIP_DAYS} days, got {lookback_days}"),
        ));
    }
    let scores = compounded_returns(prices, lookback_days - MOMENTUM_SKIP_DAYS)?;
    let ranks = rank(&scores, false)?;
    long_short_split(&ranks, top_fraction)
}

/// Mean-reversion book: the best performers over the lookback get the
/// highest rank number and therefore go short after demeaning.
pub fn value(
    prices: &PriceTable,
    lookback_days: usize,
    alpha: f64,
) -> Result<WeightVector, PortfolioError> {
    if lookback_days == 0 {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "lookback_days",
            "must be at least 1",
        ));
    }
    let rows = prices.row_count();
    if lookback_days > rows {
        return Err(PortfolioError::InsufficientHistory {
            required: lookback_days,
            available: rows,
            unit: "days",
        });
    }

    let start_row = rows - lookback_days;
    let last_row = rows - 1;
    let mut scores = Vec::with_capacity(prices.asset_count());
    for (asset, name) in prices.assets().iter().enumerate() {
        let start = prices
            .close(asset, start_row)
            .ok_or_else(|| PortfolioError::MissingAssetData {
                asset: name.clone(),
                reason: format!("no close on {}", prices.dates()[start_row]),
            })?;
        let last = prices
            .close(asset, last_row)
            .ok_or_else(|| PortfolioError::MissingAssetData {
                asset: name.clone(),
                reason: format!("no close on {}", prices.dates()[last_row]),
            })?;
        scores.push((name.clone(), last / start));
    }

    let ranks = rank(&scores.into_iter().collect(), false)?;
    normalized_weight(&demeaned_weight(&ranks, alpha))
}

/// Short-term reversal on mean returns in the latest calendar month, taken
/// from a window of `lookback_months`. Weights are demeaned ranks, not
/// normalised.
pub fn short_term_reversal(
    prices: &PriceTable,
    lookback_months: u32,
    alpha: f64,
) -> Result<WeightVector, PortfolioError> {
    let scores = latest_month_returns(prices, lookback_months)?;
    let ranks = rank(&scores, false)?;
    Ok(demeaned_weight(&ranks, alpha))
}

/// Weights proportional to the latest day-over-day change in returns.
///
/// d_i = r_i[T] - r_i[T-1] over complete return rows, w_i = d_i / sum(d).
/// This is a proportional heuristic, not a volatility estimate.
pub fn min_volatility(prices: &PriceTable) -> Result<WeightVector, PortfolioError> {
    let rows = simple_returns(prices).complete_rows();
    if rows.len() < 2 {
        return Err(PortfolioError::InsufficientHistory {
            required: 2,
            available: rows.len(),
            unit: "return rows",
        });
    }

    let latest = &rows[rows.len() - 1];
    let previous = &rows[rows.len() - 2];
    let changes: Vec<f64> = latest.iter().zip(previous).map(|(l, p)| l - p).collect();
    let total: f64 = changes.iter().sum();
    if total == 0.0 || !total.is_finite() {
        return Err(PortfolioError::degenerate(
            "day-over-day return changes sum to zero",
        ));
    }

    Ok(prices
        .assets()
        .iter()
        .cloned()
        .zip(changes.into_iter().map(|d| d / total))
        .collect())
}

pub fn equal_weight(prices: &PriceTable) -> Result<WeightVector, PortfolioError> {
    let n = prices.asset_count();
    if n == 0 {
        return Err(PortfolioError::degenerate("no assets"));
    }
    let w = 1.0 / n as f64;
    Ok(prices.assets().iter().map(|a| (a.clone(), w)).collect())
}

/// Uniform draws in [0, 1) renormalised to sum to 1.
pub fn random_weights<R: Rng + ?Sized>(
    prices: &PriceTable,
    rng: &mut R,
) -> Result<WeightVector, PortfolioError> {
    if prices.asset_count() == 0 {
        return Err(PortfolioError::degenerate("no assets"));
    }
    let draws: Vec<f64> = (0..prices.asset_count()).map(|_| rng.r#gen::<f64>()).collect();
    let total: f64 = draws.iter().sum();
    if total == 0.0 {
        return Err(PortfolioError::degenerate("random draws sum to zero"));
    }
    Ok(prices
        .assets()
        .iter()
        .cloned()
        .zip(draws.into_iter().map(|d| d / total))
        .collect())
}
