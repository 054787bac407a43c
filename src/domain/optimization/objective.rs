//! Portfolio objectives, each a pure function of (w, mu, cov).

use crate::domain::error::PortfolioError;
use nalgebra::{DMatrix, DVector};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

pub const DEFAULT_LMD_MU: f64 = 0.25;
pub const DEFAULT_LMD_VAR: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Objective {
    /// w' S w
    MinVariance,
    /// -(252 w'mu - rf) / sqrt(252 w' S w)
    MaxSharpe { risk_free_rate: f64 },
    /// Dispersion of risk contributions around sigma / N, blended with a
    /// return-seeking and a variance-penalty term.
    EqualRiskContribution { lmd_mu: f64, lmd_var: f64 },
}

impl Objective {
    pub fn equal_risk_contribution() -> Self {
        Objective::EqualRiskContribution {
            lmd_mu: DEFAULT_LMD_MU,
            lmd_var: DEFAULT_LMD_VAR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Objective::MinVariance => "min_variance",
            Objective::MaxSharpe { .. } => "max_sharpe",
            Objective::EqualRiskContribution { .. } => "equal_risk_contribution",
        }
    }

    pub fn evaluate(
        &self,
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<f64, PortfolioError> {
        match *self {
            Objective::MinVariance => Ok(portfolio_variance(weights, covariance)),
            Objective::MaxSharpe { risk_free_rate } => {
                let annual_return = weights.dot(expected_returns) * TRADING_DAYS_PER_YEAR;
                let annual_vol =
                    (portfolio_variance(weights, covariance) * TRADING_DAYS_PER_YEAR).sqrt();
                if annual_vol == 0.0 {
                    return Err(PortfolioError::ZeroVolatility);
                }
                Ok(-(annual_return - risk_free_rate) / annual_vol)
            }
            Objective::EqualRiskContribution { lmd_mu, lmd_var } => {
                let sigma_w = covariance * weights;
                let vol = weights.dot(&sigma_w).max(0.0).sqrt();
                if vol == 0.0 {
                    return Err(PortfolioError::ZeroVolatility);
                }
                let target = vol / weights.len() as f64;
                let risk_objective: f64 = weights
                    .iter()
                    .zip(sigma_w.iter())
                    .map(|(w, sw)| (w * sw / vol - target).powi(2))
                    .sum();
                Ok(risk_objective - lmd_mu * weights.dot(expected_returns) + lmd_var * vol * vol)
            }
        }
    }

    /// Analytic gradient of [`Objective::evaluate`] with respect to the weights.
    pub fn gradient(
        &self,
        weights: &DVector<f64>,
        expected_returns: &DVector<f64>,
        covariance: &DMatrix<f64>,
    ) -> Result<DVector<f64>, PortfolioError> {
        let sigma_w = covariance * weights;
        match *self {
            Objective::MinVariance => Ok(sigma_w * 2.0),
            Objective::MaxSharpe { risk_free_rate } => {
                let excess = weights.dot(expected_returns) * TRADING_DAYS_PER_YEAR - risk_free_rate;
                let annual_vol =
                    (portfolio_variance(weights, covariance) * TRADING_DAYS_PER_YEAR).sqrt();
                if annual_vol == 0.0 {
                    return Err(PortfolioError::ZeroVolatility);
                }
                Ok(expected_returns * (-TRADING_DAYS_PER_YEAR / annual_vol)
                    + sigma_w * (excess * TRADING_DAYS_PER_YEAR / annual_vol.powi(3)))
            }
            Objective::EqualRiskContribution { lmd_mu, lmd_var } => {
                let vol = weights.dot(&sigma_w).max(0.0).sqrt();
                if vol == 0.0 {
                    return Err(PortfolioError::ZeroVolatility);
                }
                let n = weights.len() as f64;
                // r_i = w_i (Sw)_i / vol - vol / n
                let residual = weights.component_mul(&sigma_w) / vol
                    - DVector::from_element(weights.len(), vol / n);
                let weighted = residual.dot(&weights.component_mul(&sigma_w));
                let risk_grad = (residual.component_mul(&sigma_w)
                    + covariance * residual.component_mul(weights))
                    / vol
                    - &sigma_w * (weighted / vol.powi(3) + residual.sum() / (n * vol));
                Ok(risk_grad * 2.0 - expected_returns * lmd_mu + &sigma_w * (2.0 * lmd_var))
            }
        }
    }
}

/// w' S w, clamped at zero against rounding on near-singular matrices.
pub fn portfolio_variance(weights: &DVector<f64>, covariance: &DMatrix<f64>) -> f64 {
    weights.dot(&(covariance * weights)).max(0.0)
}
