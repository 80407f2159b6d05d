//! Forecasting error types.

use crescent_core::CoreError;
use thiserror::Error;

/// Errors that can occur while training or querying forecast models.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("forecaster must be trained before making predictions")]
    NotTrained,

    #[error("no in-period data for training")]
    NoInPeriodData,

    #[error("required columns not found: {0:?}")]
    MissingColumns(Vec<String>),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type ForecastResult<T> = Result<T, ForecastError>;
