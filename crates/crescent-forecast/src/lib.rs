//! crescent-forecast — the decision pipeline.
//!
//! Turns an enriched traffic series into per-event forecasts. Rules decide
//! *when* to forecast (fixed trigger hours per surge window), the
//! confidence score decides *which* magnitude source to trust, and the
//! learned patterns or the seasonal baseline decide *how much*.
//!
//! # Architecture
//!
//! ```text
//! HybridForecaster
//!   ├── SeasonalBaseline   (hour → median/quantiles; fallback magnitude)
//!   ├── LearnedPatterns    (surge multipliers + per-day progression)
//!   ├── ConfidenceScorer   (six weighted factors → [0.5, 0.99])
//!   └── EventCalendar      (is the clock inside the event period?)
//! ```
//!
//! # Failure policy
//!
//! Sparse or degenerate history never errors: it resolves to conservative
//! defaults (0.6 pattern confidence, multiplier 1.0, default progression
//! factors). Caller misuse does error: forecasting before training,
//! training without any in-period rows, or asking for data quality over
//! columns that do not exist.

pub mod baseline;
pub mod confidence;
pub mod error;
pub mod forecaster;
pub mod patterns;

pub use baseline::{BaselineSummary, HourStats, SeasonalBaseline};
pub use confidence::{ConfidenceInputs, ConfidenceLevel, ConfidenceScorer};
pub use error::{ForecastError, ForecastResult};
pub use forecaster::{EventForecast, HybridForecaster, ModelSummary, TriggerRule};
pub use patterns::{DayPattern, LearnedPatterns, PatternSummary, SurgePattern};
