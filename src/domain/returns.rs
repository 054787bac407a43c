//! Period returns derived from a price table.
//!
//! r[t] = C[t] / C[p] - 1, where `p` is the asset's previous row with a
//! close. Undefined when the asset has no close at `t`, no earlier close, or
//! a zero previous close. The first row is always undefined.

use crate::domain::asset_values::ScoreVector;
use crate::domain::error::PortfolioError;
use crate::domain::price_table::PriceTable;
use chrono::{Datelike, Months, NaiveDate};
use nalgebra::{DMatrix, DVector};

/// Lookback window with an explicit unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookback {
    /// Table rows (observations), not calendar days.
    Days(usize),
    /// Calendar months back from the latest date.
    Months(u32),
}

#[derive(Debug, Clone)]
pub struct ReturnSeries {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    /// `returns[asset][row]`
    returns: Vec<Vec<Option<f64>>>,
}

impl ReturnSeries {
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn get(&self, asset: usize, row: usize) -> Option<f64> {
        self.returns[asset][row]
    }

    /// Rows where every asset has a defined return, in date order. Each row
    /// lists returns in asset order.
    pub fn complete_rows(&self) -> Vec<Vec<f64>> {
        (0..self.dates.len())
            .filter_map(|row| {
                self.returns
                    .iter()
                    .map(|col| col[row])
                    .collect::<Option<Vec<f64>>>()
            })
            .collect()
    }
}

pub fn simple_returns(prices: &PriceTable) -> ReturnSeries {
    let returns = (0..prices.asset_count())
        .map(|asset| {
            let mut out = vec![None; prices.row_count()];
            for (row, ret) in observed_returns(prices.column(asset), 0) {
                out[row] = Some(ret);
            }
            out
        })
        .collect();

    ReturnSeries {
        dates: prices.dates().to_vec(),
        assets: prices.assets().to_vec(),
        returns,
    }
}

/// `(row, return)` for every close at or after `from` that has an earlier
/// close at or after `from`. Gaps are skipped, so each return spans
/// consecutive observations of the asset.
fn observed_returns(column: &[Option<f64>], from: usize) -> Vec<(usize, f64)> {
    let mut previous: Option<f64> = None;
    let mut out = Vec::new();
    for (row, close) in column.iter().enumerate().skip(from) {
        let Some(curr) = *close else { continue };
        if let Some(prev) = previous.filter(|p| *p != 0.0) {
            out.push((row, curr / prev - 1.0));
        }
        previous = Some(curr);
    }
    out
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Mean simple return per asset over the most recent `window`.
///
/// Returns are taken between consecutive observations inside the window, so
/// the first in-window close of each asset only serves as a base. Assets
/// without any defined return inside the window are omitted.
pub fn period_returns(prices: &PriceTable, window: Lookback) -> Result<ScoreVector, PortfolioError> {
    let start_row = window_start_row(prices, window)?;

    Ok(prices
        .assets()
        .iter()
        .enumerate()
        .filter_map(|(asset, name)| {
            let returns = observed_returns(prices.column(asset), start_row);
            mean(returns.into_iter().map(|(_, r)| r)).map(|m| (name.clone(), m))
        })
        .collect())
}

/// Mean return per asset over the latest calendar month.
///
/// Returns are computed inside the window of dates strictly after
/// `latest - months` and up to `latest`, then only those dated in the
/// latest date's calendar month are averaged. Early in a month that leaves
/// the few returns since the month began.
pub fn latest_month_returns(
    prices: &PriceTable,
    months: u32,
) -> Result<ScoreVector, PortfolioError> {
    if months == 0 {
        return Err(PortfolioError::degenerate("lookback window is empty"));
    }
    let latest = prices.latest_date();
    let start = months_before(prices, months)?;
    let start_row = prices.dates().partition_point(|d| *d <= start);
    let dates = prices.dates();
    let in_latest_month =
        |row: usize| dates[row].year() == latest.year() && dates[row].month() == latest.month();

    Ok(prices
        .assets()
        .iter()
        .enumerate()
        .filter_map(|(asset, name)| {
            let returns = observed_returns(prices.column(asset), start_row);
            mean(
                returns
                    .into_iter()
                    .filter(|(row, _)| in_latest_month(*row))
                    .map(|(_, r)| r),
            )
            .map(|m| (name.clone(), m))
        })
        .collect())
}

/// Compounded return over the last `window_days` complete return rows:
/// prod(1 + r) - 1, evaluated at the latest row.
pub fn compounded_returns(
    prices: &PriceTable,
    window_days: usize,
) -> Result<ScoreVector, PortfolioError> {
    if window_days == 0 {
        return Err(PortfolioError::degenerate("compounding window is empty"));
    }
    let rows = simple_returns(prices).complete_rows();
    if rows.len() < window_days {
        return Err(PortfolioError::InsufficientHistory {
            required: window_days,
            available: rows.len(),
            unit: "return rows",
        });
    }

    let recent = &rows[rows.len() - window_days..];
    Ok(prices
        .assets()
        .iter()
        .enumerate()
        .map(|(asset, name)| {
            let growth: f64 = recent.iter().map(|row| 1.0 + row[asset]).product();
            (name.clone(), growth - 1.0)
        })
        .collect())
}

/// Mean return vector and sample covariance, in table asset order.
#[derive(Debug, Clone)]
pub struct Moments {
    pub assets: Vec<String>,
    pub expected_returns: DVector<f64>,
    pub covariance: DMatrix<f64>,
}

/// Estimate daily moments from the last `lookback_days` complete return rows.
/// Covariance uses the unbiased (n - 1) denominator.
pub fn estimate_moments(
    prices: &PriceTable,
    lookback_days: usize,
) -> Result<Moments, PortfolioError> {
    let rows = simple_returns(prices).complete_rows();
    let required = lookback_days.max(2);
    if rows.len() < required {
        return Err(PortfolioError::InsufficientHistory {
            required,
            available: rows.len(),
            unit: "return rows",
        });
    }

    let recent = &rows[rows.len() - required..];
    let n_assets = prices.asset_count();
    let n_obs = recent.len() as f64;

    let sample = DMatrix::from_fn(recent.len(), n_assets, |r, c| recent[r][c]);
    let mean = DVector::from_fn(n_assets, |c, _| sample.column(c).sum() / n_obs);

    let mut centered = sample;
    for c in 0..n_assets {
        let m = mean[c];
        centered.column_mut(c).iter_mut().for_each(|x| *x -= m);
    }
    let covariance = (centered.transpose() * &centered) / (n_obs - 1.0);

    Ok(Moments {
        assets: prices.assets().to_vec(),
        expected_returns: mean,
        covariance,
    })
}

fn window_start_row(prices: &PriceTable, window: Lookback) -> Result<usize, PortfolioError> {
    let rows = prices.row_count();
    match window {
        Lookback::Days(0) | Lookback::Months(0) => {
            Err(PortfolioError::degenerate("lookback window is empty"))
        }
        Lookback::Days(days) => {
            if days + 1 > rows {
                return Err(PortfolioError::InsufficientHistory {
                    required: days,
                    available: rows.saturating_sub(1),
                    unit: "days",
                });
            }
            Ok(rows - days - 1)
        }
        Lookback::Months(months) => {
            let start = months_before(prices, months)?;
            Ok(prices.dates().partition_point(|d| *d < start))
        }
    }
}

/// `latest - months` calendar months, which must not precede the first date.
fn months_before(prices: &PriceTable, months: u32) -> Result<NaiveDate, PortfolioError> {
    let latest = prices.latest_date();
    let first = prices.first_date();
    latest
        .checked_sub_months(Months::new(months))
        .filter(|start| *start >= first)
        .ok_or(PortfolioError::InsufficientHistory {
            required: months as usize,
            available: whole_months_between(first, latest),
            unit: "months",
        })
}

fn whole_months_between(from: NaiveDate, to: NaiveDate) -> usize {
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    months.max(0) as usize
}
