//! CLI integration tests for config loading and pipeline orchestration.
//!
//! Tests cover:
//! - Config parsing (build_strategy_config, trend_horizons)
//! - Price path resolution (resolve_prices_path)
//! - Exit code mapping for config and data failures
//! - Full allocation and trend pipelines over CSV files on disk

mod common;

use approx::assert_relative_eq;
use common::*;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use strategybank::adapters::csv_adapter::CsvPriceAdapter;
use strategybank::adapters::file_config_adapter::FileConfigAdapter;
use strategybank::cli;
use strategybank::domain::config_validation::{build_strategy_config, trend_horizons};
use strategybank::domain::error::PortfolioError;
use strategybank::domain::optimization::Bounds;
use strategybank::domain::strategy::{ObjectiveKind, RankKind, StrategyKind};
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[data]
prices_path = data/prices.csv

[strategy]
kind = max_sharpe
lookback_days = 120
risk_free_rate = 0.02
min_weight = 0.05
max_weight = 0.6
seed = 11

[solver]
max_iters = 8000
tolerance = 1e-9

[trend]
horizons = 1, 3
"#;

mod config_loading {
    use super::*;

    #[test]
    fn build_strategy_config_valid_full() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config = build_strategy_config(&adapter, None).unwrap();

        assert_eq!(config.kind, StrategyKind::Optimized(ObjectiveKind::MaxSharpe));
        assert_eq!(config.lookback_days, Some(120));
        assert_eq!(config.lookback_days(), 120);
        assert_relative_eq!(config.risk_free_rate, 0.02);
        assert_eq!(
            config.bounds,
            Bounds::Uniform {
                lower: 0.05,
                upper: 0.6
            }
        );
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.solver.max_iters, 8000);
        assert_relative_eq!(config.solver.tolerance, 1e-9);
    }

    #[test]
    fn kind_override_replaces_config_kind() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let config =
            build_strategy_config(&adapter, Some(StrategyKind::RankBased(RankKind::Value)))
                .unwrap();
        assert_eq!(config.kind, StrategyKind::RankBased(RankKind::Value));
        assert_eq!(config.lookback_days(), 120);
    }

    #[test]
    fn minimal_config_uses_kind_defaults() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = momentum\n").unwrap();
        let config = build_strategy_config(&adapter, None).unwrap();
        assert_eq!(config.lookback_days, None);
        assert_eq!(config.lookback_days(), 365);
        assert_eq!(config.bounds, Bounds::LongOnly);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn missing_kind_is_config_missing() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nalpha = 1.0\n").unwrap();
        let err = build_strategy_config(&adapter, None).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigMissing { key, .. } if key == "kind"));
    }

    #[test]
    fn unknown_kind_is_invalid() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = black_litterman\n").unwrap();
        let err = build_strategy_config(&adapter, None).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidConfig { key, .. } if key == "kind"));
    }

    #[test]
    fn trend_horizons_from_config() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        assert_eq!(trend_horizons(&adapter).unwrap(), vec![1, 3]);
    }

    #[test]
    fn load_config_from_disk() {
        let file = write_temp_ini(VALID_INI);
        let adapter = cli::load_config(file.path()).ok().unwrap();
        let config = build_strategy_config(&adapter, None).unwrap();
        assert_eq!(config.kind.name(), "max_sharpe");
    }

    #[test]
    fn load_config_missing_file_is_config_exit_code() {
        let code = cli::load_config(Path::new("/nonexistent/strategybank.ini")).err();
        assert_eq!(code, Some(ExitCode::from(2)));
    }
}

mod prices_path_resolution {
    use super::*;

    #[test]
    fn override_wins_over_config() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let path = cli::resolve_prices_path(Some(Path::new("/tmp/other.csv")), &adapter).unwrap();
        assert_eq!(path, Path::new("/tmp/other.csv"));
    }

    #[test]
    fn falls_back_to_config() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let path = cli::resolve_prices_path(None, &adapter).unwrap();
        assert_eq!(path, Path::new("data/prices.csv"));
    }

    #[test]
    fn missing_everywhere_is_config_missing() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = erc\n").unwrap();
        let err = cli::resolve_prices_path(None, &adapter).unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::ConfigMissing { section, key } if section == "data" && key == "prices_path"
        ));
    }
}

mod exit_codes {
    use super::*;

    #[test]
    fn each_error_family_has_its_code() {
        let cases = [
            (
                PortfolioError::ConfigMissing {
                    section: "strategy".into(),
                    key: "kind".into(),
                },
                2,
            ),
            (
                PortfolioError::DataSource {
                    reason: "gone".into(),
                },
                3,
            ),
            (
                PortfolioError::InsufficientHistory {
                    required: 10,
                    available: 2,
                    unit: "return rows",
                },
                4,
            ),
            (PortfolioError::ZeroVolatility, 5),
        ];
        for (err, code) in cases {
            assert_eq!(ExitCode::from(&err), ExitCode::from(code), "{err}");
        }
    }
}

mod csv_pipeline {
    use super::*;

    fn momentum_csv(dir: &TempDir) -> std::path::PathBuf {
        let table = geometric_table(
            "2023-01-01",
            396,
            &[("BHP", 0.004), ("CBA", 0.003), ("WBC", 0.002), ("NAB", 0.001)],
        );
        write_prices_csv(dir.path(), &table)
    }

    #[test]
    fn allocation_from_csv_and_ini() {
        let dir = TempDir::new().unwrap();
        let prices = momentum_csv(&dir);
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = momentum\n").unwrap();
        let config = build_strategy_config(&adapter, None).unwrap();

        let reports = RecordingReportPort::default();
        let report =
            cli::run_allocation_pipeline(&CsvPriceAdapter::new(prices), &reports, &config)
                .unwrap();

        assert_eq!(report.as_of, date("2024-01-31"));
        assert_relative_eq!(*report.weights.get("BHP").unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(*report.weights.get("CBA").unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(*report.weights.get("WBC").unwrap(), -0.25, epsilon = 1e-12);
        assert_relative_eq!(*report.weights.get("NAB").unwrap(), -0.25, epsilon = 1e-12);
        assert_eq!(reports.allocations.borrow().len(), 1);
    }

    #[test]
    fn equal_weight_override_from_csv() {
        let dir = TempDir::new().unwrap();
        let prices = momentum_csv(&dir);
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = momentum\n").unwrap();
        let kind = "equal-weight".parse::<StrategyKind>().unwrap();
        let config = build_strategy_config(&adapter, Some(kind)).unwrap();

        let reports = RecordingReportPort::default();
        let report =
            cli::run_allocation_pipeline(&CsvPriceAdapter::new(prices), &reports, &config)
                .unwrap();
        assert_eq!(report.strategy, "equal_weight");
        assert_relative_eq!(report.net_exposure, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn trend_from_csv() {
        let dir = TempDir::new().unwrap();
        let table = geometric_table("2023-01-01", 200, &[("UP", 0.001), ("DOWN", -0.001)]);
        let prices = write_prices_csv(dir.path(), &table);

        let reports = RecordingReportPort::default();
        let signal =
            cli::run_trend_pipeline(&CsvPriceAdapter::new(prices), &reports, &[1, 3]).unwrap();
        assert_eq!(signal.buy, vec!["UP".to_string()]);
        assert_eq!(signal.sell, vec!["DOWN".to_string()]);
        assert_eq!(reports.trends.borrow().as_slice(), &[signal]);
    }

    #[test]
    fn missing_csv_is_data_source_error() {
        let dir = TempDir::new().unwrap();
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = equal_weight\n").unwrap();
        let config = build_strategy_config(&adapter, None).unwrap();

        let reports = RecordingReportPort::default();
        let err = cli::run_allocation_pipeline(
            &CsvPriceAdapter::new(dir.path().join("absent.csv")),
            &reports,
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, PortfolioError::DataSource { .. }));
        assert_eq!(ExitCode::from(&err), ExitCode::from(3));
        assert!(reports.allocations.borrow().is_empty());
    }

    #[test]
    fn short_history_is_reported() {
        let dir = TempDir::new().unwrap();
        let table = geometric_table("2024-01-01", 40, &[("A", 0.001), ("B", 0.002)]);
        let prices = write_prices_csv(dir.path(), &table);
        let adapter = FileConfigAdapter::from_string("[strategy]\nkind = min_variance\n").unwrap();
        let config = build_strategy_config(&adapter, None).unwrap();

        let err = cli::run_allocation_pipeline(
            &CsvPriceAdapter::new(prices),
            &RecordingReportPort::default(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::InsufficientHistory {
                required: 252,
                available: 39,
                ..
            }
        ));
    }
}
