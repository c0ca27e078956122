//! Domain error types.

/// Top-level error type for turtletrader.
#[derive(Debug, thiserror::Error)]
pub enum TurtleError {
    #[error("insufficient data: need {needed} bars, have {available}")]
    InsufficientData { needed: usize, available: usize },

    #[error("insufficient history for {timeframe}: have {bars} bars, need {minimum}")]
    InsufficientHistory {
        timeframe: String,
        bars: usize,
        minimum: usize,
    },

    #[error("backtest window too short for {timeframe}: {days} days, need {minimum}")]
    InsufficientSpan {
        timeframe: String,
        days: i64,
        minimum: i64,
    },

    #[error("invalid price series at bar {index}: {reason}")]
    InvalidSeries { index: usize, reason: String },

    #[error("invalid ATR value {atr}: must be positive and finite")]
    InvalidAtr { atr: f64 },

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

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl TurtleError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        TurtleError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_missing(section: &str, key: &str) -> Self {
        TurtleError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&TurtleError> for std::process::ExitCode {
    fn from(err: &TurtleError) -> Self {
        let code: u8 = match err {
            TurtleError::Io(_) | TurtleError::Csv(_) | TurtleError::Json(_) => 1,
            TurtleError::ConfigParse { .. }
            | TurtleError::ConfigMissing { .. }
            | TurtleError::ConfigInvalid { .. } => 2,
            TurtleError::DataSource { .. } => 3,
            TurtleError::InsufficientData { .. }
            | TurtleError::InsufficientHistory { .. }
            | TurtleError::InsufficientSpan { .. } => 5,
            TurtleError::InvalidSeries { .. } | TurtleError::InvalidAtr { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = TurtleError::InsufficientData {
            needed: 21,
            available: 10,
        };
        assert_eq!(err.to_string(), "insufficient data: need 21 bars, have 10");
    }

    #[test]
    fn config_helpers_build_named_variants() {
        let err = TurtleError::config_invalid("backtest", "leverage", "too high");
        assert!(matches!(
            err,
            TurtleError::ConfigInvalid { ref section, ref key, .. }
                if section == "backtest" && key == "leverage"
        ));
        let err = TurtleError::config_missing("backtest", "start_date");
        assert_eq!(err.to_string(), "missing config key [backtest] start_date");
    }

    #[test]
    fn exit_codes_by_family() {
        let history = TurtleError::InsufficientHistory {
            timeframe: "1d".into(),
            bars: 10,
            minimum: 30,
        };
        let series = TurtleError::InvalidSeries {
            index: 3,
            reason: "out of order".into(),
        };
        let code = |e: &TurtleError| format!("{:?}", std::process::ExitCode::from(e));
        assert_eq!(code(&history), format!("{:?}", std::process::ExitCode::from(5)));
        assert_eq!(code(&series), format!("{:?}", std::process::ExitCode::from(6)));
    }
}
