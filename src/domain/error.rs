//! Domain error types.

/// Top-level error type for coinsim.
#[derive(Debug, thiserror::Error)]
pub enum CoinsimError {
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

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("invalid signal value {value}: expected -1, 0 or 1")]
    InvalidSignal { value: i8 },

    #[error("signal series has {signals} entries for {bars} bars")]
    SignalMismatch { bars: usize, signals: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&CoinsimError> for std::process::ExitCode {
    fn from(err: &CoinsimError) -> Self {
        let code: u8 = match err {
            CoinsimError::Io(_) => 1,
            CoinsimError::ConfigParse { .. }
            | CoinsimError::ConfigMissing { .. }
            | CoinsimError::ConfigInvalid { .. } => 2,
            CoinsimError::NoData { .. } | CoinsimError::DataSource { .. } => 3,
            CoinsimError::InvalidSignal { .. } | CoinsimError::SignalMismatch { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
