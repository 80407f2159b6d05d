//! Error types for crescent-core.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by series construction, feature derivation, and config.
///
/// Degenerate data (sparse history, missing values) never produces one of
/// these; only caller misuse and invalid configuration do.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("sample interval must be between 1 and 60 minutes, got {0}")]
    InvalidSampleInterval(u32),

    #[error("timestamps are not ordered at row {index}: {timestamp} follows {previous}")]
    UnorderedTimestamps {
        index: usize,
        previous: NaiveDateTime,
        timestamp: NaiveDateTime,
    },

    #[error("duplicate timestamp: {0}")]
    DuplicateTimestamp(NaiveDateTime),

    #[error("series spans multiple calendar years {0:?}; pass an explicit year")]
    MultiYearSeries(Vec<i32>),

    #[error("series is empty")]
    EmptySeries,

    #[error("data quality too low: {missing_pct:.1}% missing")]
    InsufficientQuality { missing_pct: f64 },

    #[error("failed to parse series: {0}")]
    Parse(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
