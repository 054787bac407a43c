//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::console_report_adapter::ConsoleReportAdapter;
use crate::adapters::csv_adapter::CsvPriceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::config_validation::{build_strategy_config, prices_path, trend_horizons};
use crate::domain::error::PortfolioError;
use crate::domain::report::AllocationReport;
use crate::domain::strategy::{self, StrategyConfig, StrategyKind};
use crate::domain::trend::{self, TrendSignal};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "strategybank",
    about = "Portfolio allocation weights from price history"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute allocation weights at the latest date
    Allocate {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overrides [data] prices_path
        #[arg(short, long)]
        prices: Option<PathBuf>,
        /// Strategy kind, overrides [strategy] kind
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Classify assets into buy and sell sets
    Trend {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        prices: Option<PathBuf>,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List available strategy kinds
    ListStrategies,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Allocate {
            config,
            prices,
            strategy,
        } => run_allocate(&config, prices.as_deref(), strategy.as_deref()),
        Command::Trend { config, prices } => run_trend(&config, prices.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListStrategies => run_list_strategies(),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        eprintln!("error: {e}");
        ExitCode::from(&e)
    })
}

/// `--prices` when given, `[data] prices_path` otherwise.
pub fn resolve_prices_path(
    prices_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, PortfolioError> {
    match prices_override {
        Some(p) => Ok(p.to_path_buf()),
        None => prices_path(config).map(PathBuf::from),
    }
}

fn run_allocate(
    config_path: &Path,
    prices_override: Option<&Path>,
    strategy_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Resolve and validate strategy
    let kind_override = match strategy_override.map(str::parse::<StrategyKind>).transpose() {
        Ok(k) => k,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let config = match build_strategy_config(&adapter, kind_override) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Strategy: {}", config.kind);

    // Stage 3: Resolve price source
    let path = match resolve_prices_path(prices_override, &adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Loading prices from {}", path.display());

    // Stages 4-5: Compute and report
    let price_port = CsvPriceAdapter::new(path);
    match run_allocation_pipeline(&price_port, &ConsoleReportAdapter::new(), &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load prices, compute the allocation and hand it to `report_port`.
pub fn run_allocation_pipeline(
    price_port: &dyn PricePort,
    report_port: &dyn ReportPort,
    config: &StrategyConfig,
) -> Result<AllocationReport, PortfolioError> {
    let prices = price_port.load_prices()?;
    eprintln!(
        "Loaded {} assets over {} dates ({} to {})",
        prices.asset_count(),
        prices.row_count(),
        prices.first_date(),
        prices.latest_date()
    );

    let report = strategy::evaluate(config, &prices)?;
    report_port.write_allocation(&report)?;
    Ok(report)
}

fn run_trend(config_path: &Path, prices_override: Option<&Path>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let horizons = match trend_horizons(&adapter) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let path = match resolve_prices_path(prices_override, &adapter) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Loading prices from {}", path.display());

    let price_port = CsvPriceAdapter::new(path);
    match run_trend_pipeline(&price_port, &ConsoleReportAdapter::new(), &horizons) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn run_trend_pipeline(
    price_port: &dyn PricePort,
    report_port: &dyn ReportPort,
    horizons_months: &[u32],
) -> Result<TrendSignal, PortfolioError> {
    let prices = price_port.load_prices()?;
    let signal = trend::trend(&prices, horizons_months)?;
    report_port.write_trend(&signal)?;
    Ok(signal)
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let config = match build_strategy_config(&adapter, None) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = trend_horizons(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("\nStrategy:        {}", config.kind);
    eprintln!("Lookback days:   {}", config.lookback_days());
    eprintln!("Lookback months: {}", config.lookback_months);
    eprintln!("Bounds:          {:?}", config.bounds);
    eprintln!(
        "Solver:          max_iters={} tolerance={:e}",
        config.solver.max_iters, config.solver.tolerance
    );

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_list_strategies() -> ExitCode {
    for kind in StrategyKind::ALL {
        println!("{kind}");
    }
    ExitCode::SUCCESS
}
