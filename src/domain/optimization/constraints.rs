//! Weight constraints: sum(w) = 1 plus per-asset bounds.

use crate::domain::error::PortfolioError;

const BRACKET_STEPS: usize = 128;
const BISECTION_STEPS: usize = 200;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Bounds {
    /// Every weight in [0, 1].
    #[default]
    LongOnly,
    Uniform { lower: f64, upper: f64 },
    PerAsset(Vec<(f64, f64)>),
}

#[derive(Debug, Clone)]
pub struct ConstraintSet {
    bounds: Vec<(f64, f64)>,
}

impl ConstraintSet {
    /// Resolve `bounds` for `n` assets. Fails when the bounds are malformed
    /// or no fully-invested portfolio fits inside them.
    pub fn new(bounds: &Bounds, n: usize) -> Result<Self, PortfolioError> {
        let resolved = match bounds {
            Bounds::LongOnly => vec![(0.0, 1.0); n],
            Bounds::Uniform { lower, upper } => vec![(*lower, *upper); n],
            Bounds::PerAsset(b) => {
                if b.len() != n {
                    return Err(PortfolioError::invalid_config(
                        "strategy",
                        "bounds",
                        format!("{} bounds for {} assets", b.len(), n),
                    ));
                }
                b.clone()
            }
        };

        for &(lo, hi) in &resolved {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(PortfolioError::invalid_config(
                    "strategy",
                    "bounds",
                    format!("invalid bound [{lo}, {hi}]"),
                ));
            }
        }

        let lower_sum: f64 = resolved.iter().map(|b| b.0).sum();
        let upper_sum: f64 = resolved.iter().map(|b| b.1).sum();
        if n == 0 || lower_sum > 1.0 || upper_sum < 1.0 {
            return Err(PortfolioError::OptimizationNonConvergence {
                reason: format!(
                    "bounds admit no fully invested portfolio (lower sum {lower_sum}, upper sum {upper_sum})"
                ),
            });
        }

        Ok(Self { bounds: resolved })
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Euclidean projection onto { lo <= w <= hi, sum(w) = 1 }.
    ///
    /// w_i = clamp(x_i - tau, lo_i, hi_i) with tau found by bisection;
    /// the clamped sum is non-increasing in tau.
    pub fn project(&self, x: &[f64]) -> Vec<f64> {
        let clamped_sum = |tau: f64| -> f64 {
            x.iter()
                .zip(&self.bounds)
                .map(|(&xi, &(lo, hi))| (xi - tau).clamp(lo, hi))
                .sum()
        };

        let x_min = x.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let mut low = x_min - 1.0;
        let mut step = 1.0;
        for _ in 0..BRACKET_STEPS {
            if clamped_sum(low) >= 1.0 {
                break;
            }
            low -= step;
            step *= 2.0;
        }

        let mut high = x_max;
        step = 1.0;
        for _ in 0..BRACKET_STEPS {
            if clamped_sum(high) <= 1.0 {
                break;
            }
            high += step;
            step *= 2.0;
        }

        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (low + high);
            if mid <= low || mid >= high {
                break;
            }
            if clamped_sum(mid) > 1.0 {
                low = mid;
            } else {
                high = mid;
            }
        }

        let tau = 0.5 * (low + high);
        x.iter()
            .zip(&self.bounds)
            .map(|(&xi, &(lo, hi))| (xi - tau).clamp(lo, hi))
            .collect()
    }

    /// Equal weights projected into the feasible set.
    pub fn starting_point(&self) -> Vec<f64> {
        let n = self.bounds.len();
        self.project(&vec![1.0 / n as f64; n])
    }

    pub fn is_satisfied(&self, weights: &[f64], tolerance: f64) -> bool {
        let sum: f64 = weights.iter().sum();
        weights.len() == self.bounds.len()
            && (sum - 1.0).abs() <= tolerance
            && weights
                .iter()
                .zip(&self.bounds)
                .all(|(&w, &(lo, hi))| w >= lo - tolerance && w <= hi + tolerance)
    }
}
