//! crescent-scale — advisory replica recommendations.
//!
//! Converts a predicted traffic level into a replica count, bounded by
//! `[1, max_units]` and annotated with hourly cost. Nothing here scales
//! anything; a human approves the recommendation.
//!
//! # Recommendation
//!
//! ```text
//! base        = ceil(predicted / capacity_per_unit)
//! needed      = max(1, ceil(base * safety_factor))
//! recommended = min(needed, max_units)         capped = needed > max_units
//! cost        = units * cost_per_unit_hour
//! within cap  = no cap, or recommended cost <= cap
//! ```
//!
//! `decide()` adds hysteresis: changes smaller than `min_unit_change`, or
//! over the cost cap, are `NoChange`.

pub mod error;
pub mod scaler;

pub use error::{ScaleError, ScaleResult};
pub use scaler::{
    ConfigSummary, ScaleDecision, ScalingCalculator, ScalingConfig, ScalingRecommendation,
};
