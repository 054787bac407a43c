//! Optimization-based allocators.
//!
//! Each strategy is an [`Objective`] minimised subject to full investment
//! (sum of weights = 1) and per-asset [`Bounds`].

pub mod constraints;
pub mod objective;
pub mod solver;

pub use constraints::{Bounds, ConstraintSet};
pub use objective::Objective;
pub use solver::SolverConfig;

use crate::domain::asset_values::WeightVector;
use crate::domain::error::PortfolioError;
use crate::domain::returns::Moments;
use nalgebra::{DMatrix, DVector};

/// Relative tolerance for the symmetry and PSD checks.
const COVARIANCE_TOLERANCE: f64 = 1e-8;

pub fn solve(
    objective: Objective,
    moments: &Moments,
    bounds: &Bounds,
    config: &SolverConfig,
) -> Result<WeightVector, PortfolioError> {
    validate_covariance(&moments.expected_returns, &moments.covariance)?;
    let constraints = ConstraintSet::new(bounds, moments.assets.len())?;
    let weights = solver::minimize(
        objective,
        &moments.expected_returns,
        &moments.covariance,
        constraints,
        config,
    )?;

    Ok(moments
        .assets
        .iter()
        .cloned()
        .zip(weights.iter().copied())
        .collect())
}

/// Reject a covariance matrix that is not square over the same assets as
/// `expected_returns`, not finite, not symmetric, or not positive
/// semi-definite.
pub fn validate_covariance(
    expected_returns: &DVector<f64>,
    covariance: &DMatrix<f64>,
) -> Result<(), PortfolioError> {
    let n = expected_returns.len();
    if n == 0 {
        return Err(PortfolioError::InvalidCovariance {
            reason: "no assets".into(),
        });
    }
    if covariance.nrows() != n || covariance.ncols() != n {
        return Err(PortfolioError::InvalidCovariance {
            reason: format!(
                "expected {n}x{n}, got {}x{}",
                covariance.nrows(),
                covariance.ncols()
            ),
        });
    }
    if covariance.iter().any(|v| !v.is_finite()) {
        return Err(PortfolioError::InvalidCovariance {
            reason: "non-finite entry".into(),
        });
    }

    let tolerance = COVARIANCE_TOLERANCE * covariance.amax().max(1.0);
    for i in 0..n {
        for j in (i + 1)..n {
            if (covariance[(i, j)] - covariance[(j, i)]).abs() > tolerance {
                return Err(PortfolioError::InvalidCovariance {
                    reason: format!("not symmetric at ({i}, {j})"),
                });
            }
        }
    }

    let min_eigenvalue = covariance
        .symmetric_eigenvalues()
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    if min_eigenvalue < -tolerance {
        return Err(PortfolioError::InvalidCovariance {
            reason: format!("not positive semi-definite (eigenvalue {min_eigenvalue:e})"),
        });
    }

    Ok(())
}
