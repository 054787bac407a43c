//! Strategy catalog and dispatch.
//!
//! A strategy is a tagged [`StrategyKind`] plus the knobs in
//! [`StrategyConfig`]. Every variant goes through [`compute_weights`].

use crate::domain::asset_values::WeightVector;
use crate::domain::error::PortfolioError;
use crate::domain::heuristics;
use crate::domain::optimization::{self, Bounds, Objective, SolverConfig};
use crate::domain::optimization::objective::{DEFAULT_LMD_MU, DEFAULT_LMD_VAR};
use crate::domain::price_table::PriceTable;
use crate::domain::report::AllocationReport;
use crate::domain::returns::estimate_moments;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_HEURISTIC_LOOKBACK_DAYS: usize = 365;
pub const DEFAULT_OPTIMIZER_LOOKBACK_DAYS: usize = 252;
pub const DEFAULT_LOOKBACK_MONTHS: u32 = 1;
pub const DEFAULT_TOP_FRACTION: f64 = 0.5;

/// Score-driven heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKind {
    Momentum,
    /// Mean reversion on the lookback price ratio.
    Value,
    ShortTermReversal,
    MinVolatility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveKind {
    MinVariance,
    MaxSharpe,
    EqualRiskContribution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    RankBased(RankKind),
    Optimized(ObjectiveKind),
    EqualWeight,
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 9] = [
        StrategyKind::RankBased(RankKind::Momentum),
        StrategyKind::RankBased(RankKind::Value),
        StrategyKind::RankBased(RankKind::ShortTermReversal),
        StrategyKind::RankBased(RankKind::MinVolatility),
        StrategyKind::Optimized(ObjectiveKind::MinVariance),
        StrategyKind::Optimized(ObjectiveKind::MaxSharpe),
        StrategyKind::Optimized(ObjectiveKind::EqualRiskContribution),
        StrategyKind::EqualWeight,
        StrategyKind::Random,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::RankBased(RankKind::Momentum) => "momentum",
            StrategyKind::RankBased(RankKind::Value) => "value",
            StrategyKind::RankBased(RankKind::ShortTermReversal) => "short_term_reversal",
            StrategyKind::RankBased(RankKind::MinVolatility) => "min_volatility",
            StrategyKind::Optimized(ObjectiveKind::MinVariance) => "min_variance",
            StrategyKind::Optimized(ObjectiveKind::MaxSharpe) => "max_sharpe",
            StrategyKind::Optimized(ObjectiveKind::EqualRiskContribution) => {
                "equal_risk_contribution"
            }
            StrategyKind::EqualWeight => "equal_weight",
            StrategyKind::Random => "random",
        }
    }

    /// Lookback used when the config does not set `lookback_days`.
    pub fn default_lookback_days(&self) -> usize {
        match self {
            StrategyKind::Optimized(_) => DEFAULT_OPTIMIZER_LOOKBACK_DAYS,
            _ => DEFAULT_HEURISTIC_LOOKBACK_DAYS,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        let alias = match normalized.as_str() {
            "mean_reversion" => "value",
            "min_vol" => "min_volatility",
            "erc" => "equal_risk_contribution",
            other => other,
        };
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.name() == alias)
            .ok_or_else(|| {
                PortfolioError::invalid_config(
                    "strategy",
                    "kind",
                    format!("unknown strategy '{s}'"),
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Observation rows; `None` means the kind's default.
    pub lookback_days: Option<usize>,
    pub lookback_months: u32,
    pub alpha: f64,
    pub risk_free_rate: f64,
    pub lmd_mu: f64,
    pub lmd_var: f64,
    pub bounds: Bounds,
    pub top_fraction: f64,
    pub seed: Option<u64>,
    pub solver: SolverConfig,
}

impl StrategyConfig {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            lookback_days: None,
            lookback_months: DEFAULT_LOOKBACK_MONTHS,
            alpha: 1.0,
            risk_free_rate: 0.0,
            lmd_mu: DEFAULT_LMD_MU,
            lmd_var: DEFAULT_LMD_VAR,
            bounds: Bounds::LongOnly,
            top_fraction: DEFAULT_TOP_FRACTION,
            seed: None,
            solver: SolverConfig::default(),
        }
    }

    pub fn lookback_days(&self) -> usize {
        self.lookback_days
            .unwrap_or_else(|| self.kind.default_lookback_days())
    }

    fn objective(&self, kind: ObjectiveKind) -> Objective {
        match kind {
            ObjectiveKind::MinVariance => Objective::MinVariance,
            ObjectiveKind::MaxSharpe => Objective::MaxSharpe {
                risk_free_rate: self.risk_free_rate,
            },
            ObjectiveKind::EqualRiskContribution => Objective::EqualRiskContribution {
                lmd_mu: self.lmd_mu,
                lmd_var: self.lmd_var,
            },
        }
    }
}

/// Compute one snapshot of weights at the latest date of `prices`.
///
/// `Random` draws from `StdRng` seeded with `config.seed` when set and
/// from the thread RNG otherwise.
pub fn compute_weights(
    config: &StrategyConfig,
    prices: &PriceTable,
) -> Result<WeightVector, PortfolioError> {
    match config.seed {
        Some(seed) => compute_weights_with_rng(config, prices, &mut StdRng::seed_from_u64(seed)),
        None => compute_weights_with_rng(config, prices, &mut rand::thread_rng()),
    }
}

pub fn compute_weights_with_rng<R: Rng + ?Sized>(
    config: &StrategyConfig,
    prices: &PriceTable,
    rng: &mut R,
) -> Result<WeightVector, PortfolioError> {
    debug!(
        strategy = config.kind.name(),
        assets = prices.asset_count(),
        rows = prices.row_count(),
        "computing weights"
    );

    match config.kind {
        StrategyKind::RankBased(RankKind::Momentum) => {
            heuristics::momentum(prices, config.lookback_days(), config.top_fraction)
        }
        StrategyKind::RankBased(RankKind::Value) => {
            heuristics::value(prices, config.lookback_days(), config.alpha)
        }
        StrategyKind::RankBased(RankKind::ShortTermReversal) => {
            heuristics::short_term_reversal(prices, config.lookback_months, config.alpha)
        }
        StrategyKind::RankBased(RankKind::MinVolatility) => heuristics::min_volatility(prices),
        StrategyKind::Optimized(kind) => {
            let moments = estimate_moments(prices, config.lookback_days())?;
            optimization::solve(
                config.objective(kind),
                &moments,
                &config.bounds,
                &config.solver,
            )
        }
        StrategyKind::EqualWeight => heuristics::equal_weight(prices),
        StrategyKind::Random => heuristics::random_weights(prices, rng),
    }
}

/// [`compute_weights`] wrapped into a report for the latest date.
pub fn evaluate(
    config: &StrategyConfig,
    prices: &PriceTable,
) -> Result<AllocationReport, PortfolioError> {
    let weights = compute_weights(config, prices)?;
    let report = AllocationReport::new(config.kind.name(), prices.latest_date(), weights);
    info!(
        strategy = %report.strategy,
        as_of = %report.as_of,
        gross = report.gross_exposure,
        net = report.net_exposure,
        "allocation computed"
    );
    Ok(report)
}
