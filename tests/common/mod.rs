#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use strategybank::domain::error::PortfolioError;
use strategybank::domain::price_table::{PriceRow, PriceTable};
use strategybank::domain::report::AllocationReport;
use strategybank::domain::trend::TrendSignal;
use strategybank::ports::price_port::PricePort;
use strategybank::ports::report_port::ReportPort;

pub struct MockPricePort {
    pub table: Option<PriceTable>,
    pub error: Option<String>,
}

impl MockPricePort {
    pub fn with_table(table: PriceTable) -> Self {
        Self {
            table: Some(table),
            error: None,
        }
    }

    pub fn with_error(reason: &str) -> Self {
        Self {
            table: None,
            error: Some(reason.to_string()),
        }
    }
}

impl PricePort for MockPricePort {
    fn load_prices(&self) -> Result<PriceTable, PortfolioError> {
        if let Some(reason) = &self.error {
            return Err(PortfolioError::DataSource {
                reason: reason.clone(),
            });
        }
        self.table.clone().ok_or_else(|| PortfolioError::DataSource {
            reason: "no table configured".into(),
        })
    }
}

/// Captures everything written so tests can inspect it.
#[derive(Default)]
pub struct RecordingReportPort {
    pub allocations: RefCell<Vec<AllocationReport>>,
    pub trends: RefCell<Vec<TrendSignal>>,
}

impl ReportPort for RecordingReportPort {
    fn write_allocation(&self, report: &AllocationReport) -> Result<(), PortfolioError> {
        self.allocations.borrow_mut().push(report.clone());
        Ok(())
    }

    fn write_trend(&self, signal: &TrendSignal) -> Result<(), PortfolioError> {
        self.trends.borrow_mut().push(signal.clone());
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Consecutive calendar days starting at `start`.
pub fn daily_dates(start: &str, days: usize) -> Vec<NaiveDate> {
    let start = date(start);
    (0..days).map(|i| start + Duration::days(i as i64)).collect()
}

/// Each asset compounds at a constant daily rate from 100.
pub fn geometric_table(start: &str, days: usize, rates: &[(&str, f64)]) -> PriceTable {
    let dates = daily_dates(start, days);
    let columns = rates
        .iter()
        .map(|(name, rate)| {
            let closes = (0..days)
                .map(|i| 100.0 * (1.0 + rate).powi(i as i32))
                .collect();
            (name.to_string(), closes)
        })
        .collect();
    PriceTable::from_columns(dates, columns).unwrap()
}

pub fn constant_table(start: &str, days: usize, assets: &[&str]) -> PriceTable {
    let rates: Vec<(&str, f64)> = assets.iter().map(|a| (*a, 0.0)).collect();
    geometric_table(start, days, &rates)
}

/// Deterministic noisy prices: a per-asset sine wobble on top of drift.
pub fn wobbly_table(start: &str, days: usize, assets: &[(&str, f64, f64)]) -> PriceTable {
    let dates = daily_dates(start, days);
    let columns = assets
        .iter()
        .enumerate()
        .map(|(k, (name, drift, amplitude))| {
            let closes = (0..days)
                .map(|i| {
                    let t = i as f64;
                    100.0 * (1.0 + drift).powi(i as i32)
                        * (1.0 + amplitude * (t * 0.7 + k as f64 * 1.3).sin())
                })
                .collect();
            (name.to_string(), closes)
        })
        .collect();
    PriceTable::from_columns(dates, columns).unwrap()
}

/// Write `table` as a long-format `Date,ID,Close` file.
pub fn write_prices_csv(dir: &Path, table: &PriceTable) -> PathBuf {
    let mut content = String::from("Date,ID,Close\n");
    for (row, d) in table.dates().iter().enumerate() {
        for (asset, name) in table.assets().iter().enumerate() {
            if let Some(close) = table.close(asset, row) {
                let _ = writeln!(content, "{},{},{}", d.format("%Y-%m-%d"), name, close);
            }
        }
    }
    let path = dir.join("prices.csv");
    std::fs::write(&path, content).unwrap();
    path
}

pub fn rows(entries: &[(&str, &str, f64)]) -> Vec<PriceRow> {
    entries
        .iter()
        .map(|(d, asset, close)| PriceRow::new(date(d), *asset, *close))
        .collect()
}
