//! Report output port trait.

use crate::domain::error::PortfolioError;
use crate::domain::report::AllocationReport;
use crate::domain::trend::TrendSignal;

/// Sink for computed allocations and trend classifications.
pub trait ReportPort {
    fn write_allocation(&self, report: &AllocationReport) -> Result<(), PortfolioError>;

    fn write_trend(&self, signal: &TrendSignal) -> Result<(), PortfolioError>;
}
