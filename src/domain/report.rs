//! Allocation result record handed to a [`ReportPort`](crate::ports::report_port::ReportPort).

use crate::domain::asset_values::WeightVector;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationReport {
    pub strategy: String,
    /// Latest date of the price table the weights were computed from.
    pub as_of: NaiveDate,
    pub weights: WeightVector,
    pub gross_exposure: f64,
    pub net_exposure: f64,
}

impl AllocationReport {
    pub fn new(strategy: impl Into<String>, as_of: NaiveDate, weights: WeightVector) -> Self {
        let gross_exposure = weights.gross();
        let net_exposure = weights.sum();
        Self {
            strategy: strategy.into(),
            as_of,
            weights,
            gross_exposure,
            net_exposure,
        }
    }

    pub fn long_count(&self) -> usize {
        self.weights.values().filter(|w| **w > 0.0).count()
    }

    pub fn short_count(&self) -> usize {
        self.weights.values().filter(|w| **w < 0.0).count()
    }
}
