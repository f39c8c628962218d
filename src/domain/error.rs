//! Domain error types.
//!
//! Parameter range violations, numerical degeneracy, short warm-up data and
//! cancellation are not errors; they are resolved where they happen. What
//! remains is configuration, data loading, strategy shape and evaluator
//! failures.

/// Top-level error type for stratgen.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown indicator: {name}")]
    UnknownIndicator { name: String },

    #[error("invalid strategy: {reason}")]
    InvalidStrategy { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("backtest evaluation failed: {reason}")]
    Evaluator { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GeneratorError {
    pub fn invalid_strategy(reason: impl Into<String>) -> Self {
        GeneratorError::InvalidStrategy {
            reason: reason.into(),
        }
    }
}

impl From<&GeneratorError> for std::process::ExitCode {
    fn from(err: &GeneratorError) -> Self {
        let code: u8 = match err {
            GeneratorError::Io(_) => 1,
            GeneratorError::ConfigParse { .. }
            | GeneratorError::ConfigMissing { .. }
            | GeneratorError::ConfigInvalid { .. } => 2,
            GeneratorError::Data { .. } | GeneratorError::InsufficientData { .. } => 3,
            GeneratorError::UnknownIndicator { .. } | GeneratorError::InvalidStrategy { .. } => 4,
            GeneratorError::Evaluator { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
