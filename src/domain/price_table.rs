//! Immutable, time-indexed table of closing prices.
//!
//! Rows arrive in long format (date, asset, close) and are stored wide: one
//! column per asset over the union of all dates. A cell is `None` when the
//! asset has no close on that date.

use crate::domain::error::PortfolioError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: NaiveDate,
    pub asset: String,
    pub close: f64,
}

impl PriceRow {
    pub fn new(date: NaiveDate, asset: impl Into<String>, close: f64) -> Self {
        Self {
            date,
            asset: asset.into(),
            close,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    assets: Vec<String>,
    /// `closes[asset][row]`
    closes: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from long-format rows.
    ///
    /// Assets keep the order in which they are first seen. Per asset, dates
    /// must be strictly increasing; a repeated (date, asset) pair or a date
    /// going backwards is rejected, as is a non-finite close.
    pub fn from_rows<I>(rows: I) -> Result<Self, PortfolioError>
    where
        I: IntoIterator<Item = PriceRow>,
    {
        let rows: Vec<PriceRow> = rows.into_iter().collect();
        if rows.is_empty() {
            return Err(PortfolioError::InvalidPriceData {
                reason: "no price rows".into(),
            });
        }

        let mut assets: Vec<String> = Vec::new();
        let mut asset_index: HashMap<String, usize> = HashMap::new();
        let mut last_date: Vec<NaiveDate> = Vec::new();

        for row in &rows {
            if !row.close.is_finite() {
                return Err(PortfolioError::InvalidPriceData {
                    reason: format!("non-finite close for {} on {}", row.asset, row.date),
                });
            }
            match asset_index.get(&row.asset) {
                Some(&idx) => {
                    let prev = last_date[idx];
                    if row.date == prev {
                        return Err(PortfolioError::InvalidPriceData {
                            reason: format!("duplicate row for {} on {}", row.asset, row.date),
                        });
                    }
                    if row.date < prev {
                        return Err(PortfolioError::InvalidPriceData {
                            reason: format!(
                                "dates for {} are not increasing ({} after {})",
                                row.asset, row.date, prev
                            ),
                        });
                    }
                    last_date[idx] = row.date;
                }
                None => {
                    asset_index.insert(row.asset.clone(), assets.len());
                    assets.push(row.asset.clone());
                    last_date.push(row.date);
                }
            }
        }

        let dates: Vec<NaiveDate> = rows
            .iter()
            .map(|r| r.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_of: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();

        let mut closes = vec![vec![None; dates.len()]; assets.len()];
        for row in rows {
            let a = asset_index[&row.asset];
            let r = row_of[&row.date];
            closes[a][r] = Some(row.close);
        }

        Ok(Self {
            dates,
            assets,
            closes,
        })
    }

    /// Build a table from aligned columns sharing one date index.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, PortfolioError> {
        let mut rows = Vec::with_capacity(dates.len() * columns.len());
        for (asset, values) in &columns {
            if values.len() != dates.len() {
                return Err(PortfolioError::InvalidPriceData {
                    reason: format!(
                        "column {} has {} values for {} dates",
                        asset,
                        values.len(),
                        dates.len()
                    ),
                });
            }
        }
        for (i, &date) in dates.iter().enumerate() {
            for (asset, values) in &columns {
                rows.push(PriceRow::new(date, asset.clone(), values[i]));
            }
        }
        Self::from_rows(rows)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn row_count(&self) -> usize {
        self.dates.len()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn latest_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Close of `asset` (by index) at `row`, if it traded that date.
    pub fn close(&self, asset: usize, row: usize) -> Option<f64> {
        self.closes[asset][row]
    }

    pub fn column(&self, asset: usize) -> &[Option<f64>] {
        &self.closes[asset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn from_rows_builds_wide_table() {
        let table = PriceTable::from_rows(vec![
            PriceRow::new(d("2024-01-02"), "BTC", 100.0),
            PriceRow::new(d("2024-01-02"), "ETH", 10.0),
            PriceRow::new(d("2024-01-03"), "BTC", 101.0),
            PriceRow::new(d("2024-01-04"), "ETH", 11.0),
        ])
        .unwrap();

        assert_eq!(table.assets(), &["BTC".to_string(), "ETH".to_string()]);
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.first_date(), d("2024-01-02"));
        assert_eq!(table.latest_date(), d("2024-01-04"));
        assert_eq!(table.close(0, 1), Some(101.0));
        assert_eq!(table.close(1, 1), None);
        assert_eq!(table.close(1, 2), Some(11.0));
    }

    #[test]
    fn assets_keep_first_seen_order() {
        let table = PriceTable::from_rows(vec![
            PriceRow::new(d("2024-01-02"), "ZEC", 1.0),
            PriceRow::new(d("2024-01-02"), "ADA", 1.0),
        ])
        .unwrap();
        assert_eq!(table.asset_index("ZEC"), Some(0));
        assert_eq!(table.asset_index("ADA"), Some(1));
        assert_eq!(table.asset_index("XRP"), None);
    }

    #[test]
    fn rejects_duplicate_date_asset_pair() {
        let err = PriceTable::from_rows(vec![
            PriceRow::new(d("2024-01-02"), "BTC", 100.0),
            PriceRow::new(d("2024-01-02"), "BTC", 101.0),
        ])
        .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidPriceData { reason } if reason.contains("duplicate")));
    }

    #[test]
    fn rejects_decreasing_dates() {
        let err = PriceTable::from_rows(vec![
            PriceRow::new(d("2024-01-03"), "BTC", 100.0),
            PriceRow::new(d("2024-01-02"), "BTC", 101.0),
        ])
        .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidPriceData { .. }));
    }

    #[test]
    fn rejects_non_finite_close() {
        let err =
            PriceTable::from_rows(vec![PriceRow::new(d("2024-01-02"), "BTC", f64::NAN)])
                .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidPriceData { .. }));
    }

    #[test]
    fn rejects_empty_input() {
        assert!(PriceTable::from_rows(Vec::new()).is_err());
    }

    #[test]
    fn from_columns_checks_lengths() {
        let dates = vec![d("2024-01-02"), d("2024-01-03")];
        let err = PriceTable::from_columns(dates, vec![("BTC".into(), vec![1.0])]).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidPriceData { .. }));
    }
}
