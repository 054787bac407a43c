//! Plain-text report adapter writing to stdout.

use crate::domain::error::PortfolioError;
use crate::domain::report::AllocationReport;
use crate::domain::trend::TrendSignal;
use crate::ports::report_port::ReportPort;
use std::fmt::Write as _;
use std::io::Write;

pub struct ConsoleReportAdapter;

impl ConsoleReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, text: &str) -> Result<(), PortfolioError> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl Default for ConsoleReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for ConsoleReportAdapter {
    fn write_allocation(&self, report: &AllocationReport) -> Result<(), PortfolioError> {
        self.emit(&render_allocation(report))
    }

    fn write_trend(&self, signal: &TrendSignal) -> Result<(), PortfolioError> {
        self.emit(&render_trend(signal))
    }
}

/// Weight table followed by exposure totals.
pub fn render_allocation(report: &AllocationReport) -> String {
    let width = report
        .weights
        .assets()
        .map(str::len)
        .chain(std::iter::once("Asset".len()))
        .max()
        .unwrap_or(5);

    let mut out = String::new();
    let _ = writeln!(out, "Strategy: {}", report.strategy);
    let _ = writeln!(out, "As of:    {}", report.as_of);
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<width$}  {:>10}", "Asset", "Weight");
    let _ = writeln!(out, "{}  {}", "-".repeat(width), "-".repeat(10));
    for (asset, weight) in report.weights.iter() {
        let _ = writeln!(out, "{:<width$}  {:>10.4}", asset, weight);
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Long: {}  Short: {}  Gross: {:.4}  Net: {:.4}",
        report.long_count(),
        report.short_count(),
        report.gross_exposure,
        report.net_exposure
    );
    out
}

pub fn render_trend(signal: &TrendSignal) -> String {
    let list = |assets: &[String]| {
        if assets.is_empty() {
            "(none)".to_string()
        } else {
            assets.join(", ")
        }
    };
    format!("Buy:  {}\nSell: {}\n", list(&signal.buy), list(&signal.sell))
}
