//! CSV price file adapter.
//!
//! Reads long-format files with `Date`, `ID` and `Close` columns (matched
//! by header name, case-insensitive; other columns are ignored). Dates are
//! `%Y-%m-%d`. A blank close is treated as no observation.

use crate::domain::error::PortfolioError;
use crate::domain::price_table::{PriceRow, PriceTable};
use crate::ports::price_port::PricePort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

const DATE_COLUMN: &str = "date";
const ID_COLUMN: &str = "id";
const CLOSE_COLUMN: &str = "close";

pub struct CsvPriceAdapter {
    path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_rows(&self) -> Result<Vec<PriceRow>, PortfolioError> {
        let content = fs::read_to_string(&self.path).map_err(|e| PortfolioError::DataSource {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().cloned().map_err(|e| PortfolioError::DataSource {
            reason: format!("CSV header error: {}", e),
        })?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| PortfolioError::DataSource {
                    reason: format!("missing {} column", name),
                })
        };
        let date_idx = column(DATE_COLUMN)?;
        let id_idx = column(ID_COLUMN)?;
        let close_idx = column(CLOSE_COLUMN)?;

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            // Header is line 1.
            let line = line + 2;
            let record = result.map_err(|e| PortfolioError::DataSource {
                reason: format!("CSV parse error: {}", e),
            })?;

            let field = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(str::trim)
                    .ok_or_else(|| PortfolioError::DataSource {
                        reason: format!("line {}: missing {} value", line, name),
                    })
            };

            let close_str = field(close_idx, CLOSE_COLUMN)?;
            if close_str.is_empty() {
                continue;
            }
            let close: f64 = close_str.parse().map_err(|e| PortfolioError::DataSource {
                reason: format!("line {}: invalid close value: {}", line, e),
            })?;

            let date = NaiveDate::parse_from_str(field(date_idx, DATE_COLUMN)?, "%Y-%m-%d")
                .map_err(|e| PortfolioError::DataSource {
                    reason: format!("line {}: invalid date format: {}", line, e),
                })?;

            let asset = field(id_idx, ID_COLUMN)?;
            if asset.is_empty() {
                return Err(PortfolioError::DataSource {
                    reason: format!("line {}: empty asset id", line),
                });
            }

            rows.push(PriceRow::new(date, asset, close));
        }

        Ok(rows)
    }
}

impl PricePort for CsvPriceAdapter {
    fn load_prices(&self) -> Result<PriceTable, PortfolioError> {
        let mut rows = self.read_rows()?;
        rows.sort_by_key(|r| r.date);
        debug!(path = %self.path.display(), rows = rows.len(), "loaded price rows");
        PriceTable::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv(content: &str) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn load_prices_builds_wide_table() {
        let (_dir, path) = write_csv(
            "Date,ID,Close\n\
             2024-01-15,BHP,45.10\n\
             2024-01-15,CBA,101.00\n\
             2024-01-16,BHP,45.60\n\
             2024-01-16,CBA,102.50\n",
        );
        let table = CsvPriceAdapter::new(path).load_prices().unwrap();

        assert_eq!(table.assets(), ["BHP".to_string(), "CBA".to_string()]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.close(1, 1), Some(102.5));
        assert_eq!(
            table.latest_date(),
            NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
        );
    }

    #[test]
    fn columns_matched_by_name_in_any_order() {
        let (_dir, path) = write_csv(
            "close,volume,id,date\n\
             10.0,500,AAA,2024-02-01\n\
             11.0,600,AAA,2024-02-02\n",
        );
        let table = CsvPriceAdapter::new(path).load_prices().unwrap();
        assert_eq!(table.close(0, 1), Some(11.0));
    }

    #[test]
    fn unsorted_rows_are_ordered_by_date() {
        let (_dir, path) = write_csv(
            "Date,ID,Close\n\
             2024-01-17,BHP,3.0\n\
             2024-01-15,BHP,1.0\n\
             2024-01-16,BHP,2.0\n",
        );
        let table = CsvPriceAdapter::new(path).load_prices().unwrap();
        assert_eq!(table.column(0), &[Some(1.0), Some(2.0), Some(3.0)]);
    }

    #[test]
    fn blank_close_is_skipped() {
        let (_dir, path) = write_csv(
            "Date,ID,Close\n\
             2024-01-15,BHP,1.0\n\
             2024-01-15,CBA,\n\
             2024-01-16,CBA,5.0\n",
        );
        let table = CsvPriceAdapter::new(path).load_prices().unwrap();
        let cba = table.asset_index("CBA").unwrap();
        assert_eq!(table.close(cba, 0), None);
        assert_eq!(table.close(cba, 1), Some(5.0));
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let (_dir, path) = write_csv(
            "Date,ID,Close\n\
             2024-01-15,BHP,1.0\n\
             2024-01-15,BHP,1.1\n",
        );
        let err = CsvPriceAdapter::new(path).load_prices().unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidPriceData { .. }));
    }

    #[test]
    fn missing_column_is_reported() {
        let (_dir, path) = write_csv("Date,Ticker,Close\n2024-01-15,BHP,1.0\n");
        let err = CsvPriceAdapter::new(path).load_prices().unwrap_err();
        assert!(matches!(err, PortfolioError::DataSource { reason } if reason.contains("id")));
    }

    #[test]
    fn bad_date_names_the_line() {
        let (_dir, path) = write_csv("Date,ID,Close\n2024-01-15,BHP,1.0\n15/01/2024,BHP,2.0\n");
        let err = CsvPriceAdapter::new(path).load_prices().unwrap_err();
        assert!(matches!(err, PortfolioError::DataSource { reason } if reason.contains("line 3")));
    }

    #[test]
    fn missing_file_is_a_data_source_error() {
        let err = CsvPriceAdapter::new(PathBuf::from("/nonexistent/prices.csv"))
            .load_prices()
            .unwrap_err();
        assert!(matches!(err, PortfolioError::DataSource { .. }));
    }
}
