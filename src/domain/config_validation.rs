//! Configuration validation.
//!
//! Checks every key before a run and turns the INI sections into a
//! [`StrategyConfig`]. Present-but-unparseable values are rejected instead
//! of falling back to defaults.

use crate::domain::error::PortfolioError;
use crate::domain::heuristics::MOMENTUM_SKIP_DAYS;
use crate::domain::optimization::{Bounds, SolverConfig};
use crate::domain::strategy::{RankKind, StrategyConfig, StrategyKind};
use crate::domain::trend::DEFAULT_HORIZONS;
use crate::ports::config_port::ConfigPort;
use std::str::FromStr;

/// Build a [`StrategyConfig`] from `[strategy]` and `[solver]`.
///
/// `kind_override` replaces `[strategy] kind`, e.g. from the command line.
pub fn build_strategy_config(
    config: &dyn ConfigPort,
    kind_override: Option<StrategyKind>,
) -> Result<StrategyConfig, PortfolioError> {
    let kind = match kind_override {
        Some(kind) => kind,
        None => validate_kind(config)?,
    };

    let mut strategy = StrategyConfig::new(kind);
    strategy.lookback_days = validate_lookback_days(config, kind)?;
    strategy.lookback_months =
        parse_key::<u32>(config, "strategy", "lookback_months")?.unwrap_or(strategy.lookback_months);
    if strategy.lookback_months == 0 {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "lookback_months",
            "lookback_months must be at least 1",
        ));
    }
    strategy.alpha = validate_alpha(config)?.unwrap_or(strategy.alpha);
    strategy.risk_free_rate = validate_risk_free_rate(config)?.unwrap_or(strategy.risk_free_rate);
    strategy.lmd_mu = validate_non_negative(config, "lmd_mu")?.unwrap_or(strategy.lmd_mu);
    strategy.lmd_var = validate_non_negative(config, "lmd_var")?.unwrap_or(strategy.lmd_var);
    strategy.bounds = validate_bounds(config)?;
    strategy.top_fraction = validate_top_fraction(config)?.unwrap_or(strategy.top_fraction);
    strategy.seed = parse_key::<u64>(config, "strategy", "seed")?;
    strategy.solver = validate_solver(config)?;
    Ok(strategy)
}

/// `[trend] horizons`, a comma list of months. Defaults to 1, 6, 12.
pub fn trend_horizons(config: &dyn ConfigPort) -> Result<Vec<u32>, PortfolioError> {
    let Some(items) = config.get_list("trend", "horizons") else {
        return Ok(DEFAULT_HORIZONS.to_vec());
    };
    if items.is_empty() {
        return Err(PortfolioError::invalid_config(
            "trend",
            "horizons",
            "at least one horizon is required",
        ));
    }
    items
        .iter()
        .map(|item| match item.parse::<u32>() {
            Ok(months) if months > 0 => Ok(months),
            _ => Err(PortfolioError::invalid_config(
                "trend",
                "horizons",
                format!("'{item}' is not a positive number of months"),
            )),
        })
        .collect()
}

/// `[data] prices_path`.
pub fn prices_path(config: &dyn ConfigPort) -> Result<String, PortfolioError> {
    match config.get_string("data", "prices_path") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(PortfolioError::ConfigMissing {
            section: "data".to_string(),
            key: "prices_path".to_string(),
        }),
    }
}

fn validate_kind(config: &dyn ConfigPort) -> Result<StrategyKind, PortfolioError> {
    match config.get_string("strategy", "kind") {
        Some(s) if !s.trim().is_empty() => s.parse(),
        _ => Err(PortfolioError::ConfigMissing {
            section: "strategy".to_string(),
            key: "kind".to_string(),
        }),
    }
}

fn validate_lookback_days(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<Option<usize>, PortfolioError> {
    let Some(days) = parse_key::<usize>(config, "strategy", "lookback_days")? else {
        return Ok(None);
    };
    if days == 0 {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "lookback_days",
            "lookback_days must be at least 1",
        ));
    }
    if kind == StrategyKind::RankBased(RankKind::Momentum) && days <= MOMENTUM_SKIP_DAYS {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "lookback_days",
            format!("momentum lookback_days must exceed {MOMENTUM_SKIP_DAYS}"),
        ));
    }
    Ok(Some(days))
}

fn validate_alpha(config: &dyn ConfigPort) -> Result<Option<f64>, PortfolioError> {
    let value = parse_key::<f64>(config, "strategy", "alpha")?;
    if let Some(alpha) = value {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(PortfolioError::invalid_config(
                "strategy",
                "alpha",
                "alpha must be positive",
            ));
        }
    }
    Ok(value)
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<Option<f64>, PortfolioError> {
    let value = parse_key::<f64>(config, "strategy", "risk_free_rate")?;
    if let Some(rate) = value {
        if !(0.0..1.0).contains(&rate) {
            return Err(PortfolioError::invalid_config(
                "strategy",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
    }
    Ok(value)
}

fn validate_non_negative(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, PortfolioError> {
    let value = parse_key::<f64>(config, "strategy", key)?;
    if let Some(v) = value {
        if !v.is_finite() || v < 0.0 {
            return Err(PortfolioError::invalid_config(
                "strategy",
                key,
                format!("{key} must be non-negative"),
            ));
        }
    }
    Ok(value)
}

fn validate_bounds(config: &dyn ConfigPort) -> Result<Bounds, PortfolioError> {
    let lower = parse_key::<f64>(config, "strategy", "min_weight")?;
    let upper = parse_key::<f64>(config, "strategy", "max_weight")?;
    if lower.is_none() && upper.is_none() {
        return Ok(Bounds::LongOnly);
    }

    let lower = lower.unwrap_or(0.0);
    let upper = upper.unwrap_or(1.0);
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(PortfolioError::invalid_config(
            "strategy",
            "min_weight",
            "min_weight must not exceed max_weight",
        ));
    }
    Ok(Bounds::Uniform { lower, upper })
}

fn validate_top_fraction(config: &dyn ConfigPort) -> Result<Option<f64>, PortfolioError> {
    let value = parse_key::<f64>(config, "strategy", "top_fraction")?;
    if let Some(fraction) = value {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(PortfolioError::invalid_config(
                "strategy",
                "top_fraction",
                "top_fraction must be between 0 and 1 (exclusive)",
            ));
        }
    }
    Ok(value)
}

fn validate_solver(config: &dyn ConfigPort) -> Result<SolverConfig, PortfolioError> {
    let defaults = SolverConfig::default();
    let max_iters = parse_key::<u64>(config, "solver", "max_iters")?.unwrap_or(defaults.max_iters);
    if max_iters == 0 {
        return Err(PortfolioError::invalid_config(
            "solver",
            "max_iters",
            "max_iters must be at least 1",
        ));
    }
    let tolerance = parse_key::<f64>(config, "solver", "tolerance")?.unwrap_or(defaults.tolerance);
    if !tolerance.is_finite() || tolerance <= 0.0 {
        return Err(PortfolioError::invalid_config(
            "solver",
            "tolerance",
            "tolerance must be positive",
        ));
    }
    Ok(SolverConfig {
        max_iters,
        tolerance,
    })
}

/// `None` when the key is absent or blank; an error when it does not parse.
fn parse_key<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, PortfolioError> {
    match config.get_string(section, key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse::<T>().map(Some).map_err(|_| {
            PortfolioError::invalid_config(section, key, format!("cannot parse '{}'", raw.trim()))
        }),
        _ => Ok(None),
    }
}
