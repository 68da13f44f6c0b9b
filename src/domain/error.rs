//! Domain error types.

use crate::domain::position::SlotKey;

/// Top-level error type for turtletrader.
#[derive(Debug, thiserror::Error)]
pub enum TurtleError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {asset}")]
    NoData { asset: String },

    #[error("slot {key} already holds an open position")]
    SlotAlreadyOpen { key: SlotKey },

    #[error("slot {key} has no open position to close")]
    SlotFlat { key: SlotKey },

    #[error("exchange error: {reason}")]
    Exchange { reason: String },

    #[error("state error: {reason}")]
    State { reason: String },

    #[error("notification error: {reason}")]
    Notify { reason: String },

    #[error("lock error: {reason}")]
    Lock { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
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
            TurtleError::Io(_) => 1,
            TurtleError::ConfigParse { .. }
            | TurtleError::ConfigMissing { .. }
            | TurtleError::ConfigInvalid { .. } => 2,
            TurtleError::Data { .. } | TurtleError::NoData { .. } => 3,
            TurtleError::State { .. } | TurtleError::Json(_) | TurtleError::Lock { .. } => 4,
            TurtleError::Exchange { .. } | TurtleError::Notify { .. } => 5,
            TurtleError::SlotAlreadyOpen { .. } | TurtleError::SlotFlat { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
