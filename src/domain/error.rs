//! Domain error types.

/// Top-level error type for strategybank.
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    InvalidConfig {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price source error: {reason}")]
    DataSource { reason: String },

    #[error("invalid price data: {reason}")]
    InvalidPriceData { reason: String },

    #[error("insufficient history: need {required} {unit}, have {available}")]
    InsufficientHistory {
        required: usize,
        available: usize,
        unit: &'static str,
    },

    #[error("missing data for {asset}: {reason}")]
    MissingAssetData { asset: String, reason: String },

    #[error("degenerate input: {reason}")]
    DegenerateInput { reason: String },

    #[error("invalid covariance matrix: {reason}")]
    InvalidCovariance { reason: String },

    #[error("optimizer did not converge: {reason}")]
    OptimizationNonConvergence { reason: String },

    #[error("portfolio volatility is zero")]
    ZeroVolatility,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortfolioError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        PortfolioError::DegenerateInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_config(section: &str, key: &str, reason: impl Into<String>) -> Self {
        PortfolioError::InvalidConfig {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&PortfolioError> for std::process::ExitCode {
    fn from(err: &PortfolioError) -> Self {
        let code: u8 = match err {
            PortfolioError::Io(_) => 1,
            PortfolioError::ConfigParse { .. }
            | PortfolioError::ConfigMissing { .. }
            | PortfolioError::InvalidConfig { .. } => 2,
            PortfolioError::DataSource { .. } | PortfolioError::InvalidPriceData { .. } => 3,
            PortfolioError::InsufficientHistory { .. }
            | PortfolioError::MissingAssetData { .. } => 4,
            PortfolioError::DegenerateInput { .. }
            | PortfolioError::InvalidCovariance { .. }
            | PortfolioError::OptimizationNonConvergence { .. }
            | PortfolioError::ZeroVolatility => 5,
        };
        std::process::ExitCode::from(code)
    }
}
