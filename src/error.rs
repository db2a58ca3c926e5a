use thiserror::Error;

/// A `timestamp,mode,token` line that could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected `timestamp,mode,token`, found {0} field(s)")]
    MissingField(usize),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("empty token")]
    EmptyToken,

    #[error("unrecognised token: {0}")]
    UnknownToken(String),
}

/// Invalid analyzer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("repeat threshold for `{0}` must be at least 1")]
    ZeroThreshold(char),

    #[error("repeat threshold for `{0}` is {1}, above the maximum of {max}", max = crate::config::MAX_REPEAT_THRESHOLD)]
    ThresholdTooLarge(char, u32),
}
