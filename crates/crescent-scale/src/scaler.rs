//! Scaling calculator.
//!
//! Stateless apart from its validated configuration. Every recommendation
//! is a pure function of `(config, predicted traffic, current units)`.

use std::fmt::Write as _;

use crescent_core::config::ScalingSection;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScaleError, ScaleResult};

pub const MIN_UNITS: u32 = 1;
pub const DEFAULT_MAX_UNITS: u32 = 50;
pub const DEFAULT_SAFETY_FACTOR: f64 = 1.2;
pub const DEFAULT_CAPACITY_PER_UNIT: f64 = 100.0;
pub const DEFAULT_COST_PER_UNIT_HOUR: f64 = 0.10;
pub const DEFAULT_MIN_UNIT_CHANGE: u32 = 2;

/// Calculator configuration, validated by [`ScalingCalculator::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Traffic one unit can serve, in the same unit as predicted traffic.
    pub capacity_per_unit: f64,
    /// Headroom multiplier, `>= 1.0`.
    pub safety_factor: f64,
    pub cost_per_unit_hour: f64,
    pub max_units: u32,
    pub cost_cap_per_hour: Option<f64>,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            capacity_per_unit: DEFAULT_CAPACITY_PER_UNIT,
            safety_factor: DEFAULT_SAFETY_FACTOR,
            cost_per_unit_hour: DEFAULT_COST_PER_UNIT_HOUR,
            max_units: DEFAULT_MAX_UNITS,
            cost_cap_per_hour: None,
        }
    }
}

impl ScalingConfig {
    /// Defaults overridden by whatever the `[scaling]` table sets.
    pub fn from_section(section: &ScalingSection) -> Self {
        let d = Self::default();
        Self {
            capacity_per_unit: section.capacity_per_unit.unwrap_or(d.capacity_per_unit),
            safety_factor: section.safety_factor.unwrap_or(d.safety_factor),
            cost_per_unit_hour: section.cost_per_unit_hour.unwrap_or(d.cost_per_unit_hour),
            max_units: section.max_units.unwrap_or(d.max_units),
            cost_cap_per_hour: section.cost_cap_per_hour,
        }
    }

    fn validate(&self) -> ScaleResult<()> {
        if !(self.capacity_per_unit > 0.0) || !self.capacity_per_unit.is_finite() {
            return Err(invalid_config("capacity_per_unit", self.capacity_per_unit, "> 0"));
        }
        if !(self.safety_factor >= 1.0) || !self.safety_factor.is_finite() {
            return Err(invalid_config("safety_factor", self.safety_factor, ">= 1.0"));
        }
        if !(self.cost_per_unit_hour >= 0.0) || !self.cost_per_unit_hour.is_finite() {
            return Err(invalid_config("cost_per_unit_hour", self.cost_per_unit_hour, ">= 0"));
        }
        if self.max_units < MIN_UNITS {
            return Err(ScaleError::InvalidConfig(format!(
                "max_units must be >= {MIN_UNITS}, got {}",
                self.max_units
            )));
        }
        if let Some(cap) = self.cost_cap_per_hour
            && !(cap >= 0.0)
        {
            return Err(invalid_config("cost_cap_per_hour", cap, ">= 0"));
        }
        Ok(())
    }
}

fn invalid_config(field: &str, value: f64, bound: &str) -> ScaleError {
    ScaleError::InvalidConfig(format!("{field} must be {bound}, got {value}"))
}

/// A replica recommendation with its cost impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRecommendation {
    pub current_units: u32,
    /// Always in `[1, max_units]`.
    pub recommended_units: u32,
    pub predicted_traffic: f64,
    pub capacity_per_unit: f64,
    pub safety_factor: f64,
    pub cost_per_unit_hour: f64,
    pub current_cost_per_hour: f64,
    pub recommended_cost_per_hour: f64,
    /// Negative when scaling down.
    pub cost_delta_per_hour: f64,
    pub reason: String,
    pub capped_at_max: bool,
    pub within_cost_cap: bool,
}

impl ScalingRecommendation {
    /// Signed replica change.
    pub fn unit_delta(&self) -> i64 {
        i64::from(self.recommended_units) - i64::from(self.current_units)
    }
}

/// Whether a recommendation is worth acting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleDecision {
    /// Scale to the specified unit count.
    ScaleTo(u32),
    /// Change too small, or over the cost cap.
    NoChange,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigSummary {
    pub capacity_per_unit: f64,
    pub safety_factor: f64,
    pub cost_per_unit_hour: f64,
    pub max_units: u32,
    pub min_units: u32,
    pub cost_cap_per_hour: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ScalingCalculator {
    config: ScalingConfig,
}

impl ScalingCalculator {
    /// Validate `config`. Invalid values are rejected, never clamped.
    pub fn new(config: ScalingConfig) -> ScaleResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScalingConfig {
        &self.config
    }

    pub fn calculate_recommendation(
        &self,
        predicted_traffic: f64,
        current_units: u32,
        reason: &str,
    ) -> ScaleResult<ScalingRecommendation> {
        if !(predicted_traffic >= 0.0) || !predicted_traffic.is_finite() {
            return Err(ScaleError::InvalidInput(format!(
                "predicted_traffic must be a finite value >= 0, got {predicted_traffic}"
            )));
        }
        if current_units < MIN_UNITS {
            return Err(ScaleError::InvalidInput(format!(
                "current_units must be >= {MIN_UNITS}, got {current_units}"
            )));
        }
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ScaleError::InvalidInput("reason must not be empty".to_string()));
        }

        let c = &self.config;
        let base = (predicted_traffic / c.capacity_per_unit).ceil();
        let needed = ((base * c.safety_factor).ceil() as u32).max(MIN_UNITS);

        let capped_at_max = needed > c.max_units;
        let recommended_units = needed.min(c.max_units);

        let current_cost = f64::from(current_units) * c.cost_per_unit_hour;
        let recommended_cost = f64::from(recommended_units) * c.cost_per_unit_hour;
        let within_cost_cap = c.cost_cap_per_hour.is_none_or(|cap| recommended_cost <= cap);

        debug!(
            predicted_traffic,
            current_units,
            needed,
            recommended_units,
            capped_at_max,
            within_cost_cap,
            "scaling recommendation"
        );

        Ok(ScalingRecommendation {
            current_units,
            recommended_units,
            predicted_traffic,
            capacity_per_unit: c.capacity_per_unit,
            safety_factor: c.safety_factor,
            cost_per_unit_hour: c.cost_per_unit_hour,
            current_cost_per_hour: current_cost,
            recommended_cost_per_hour: recommended_cost,
            cost_delta_per_hour: recommended_cost - current_cost,
            reason: reason.to_string(),
            capped_at_max,
            within_cost_cap,
        })
    }

    /// Hysteresis gate: small changes and over-cap recommendations are
    /// `NoChange`.
    pub fn decide(&self, rec: &ScalingRecommendation, min_unit_change: u32) -> ScaleDecision {
        if rec.unit_delta().unsigned_abs() < u64::from(min_unit_change) || !rec.within_cost_cap {
            return ScaleDecision::NoChange;
        }
        ScaleDecision::ScaleTo(rec.recommended_units)
    }

    pub fn should_scale(&self, rec: &ScalingRecommendation, min_unit_change: u32) -> bool {
        matches!(self.decide(rec, min_unit_change), ScaleDecision::ScaleTo(_))
    }

    /// Multi-line, human-readable rendering for logs and alerts.
    pub fn format_recommendation(&self, rec: &ScalingRecommendation) -> String {
        let mut out = String::from("Scaling Recommendation:\n");
        let _ = writeln!(out, "  Reason: {}", rec.reason);
        let _ = writeln!(out, "  Current replicas: {}", rec.current_units);
        let _ = writeln!(out, "  Recommended replicas: {}", rec.recommended_units);
        let _ = writeln!(out, "  Predicted traffic: {:.1}", rec.predicted_traffic);
        let _ = writeln!(out, "  Capacity per replica: {:.1}", rec.capacity_per_unit);
        let _ = writeln!(out, "  Safety factor: {:.2}", rec.safety_factor);
        let _ = writeln!(out, "  Current cost: ${:.2}/hour", rec.current_cost_per_hour);
        let _ = writeln!(out, "  Recommended cost: ${:.2}/hour", rec.recommended_cost_per_hour);
        let _ = write!(out, "  Cost impact: ${:+.2}/hour", rec.cost_delta_per_hour);

        if rec.capped_at_max {
            let _ = write!(out, "\n  ! CAPPED at MAX_REPLICAS ({})", self.config.max_units);
        }
        if !rec.within_cost_cap
            && let Some(cap) = self.config.cost_cap_per_hour
        {
            let _ = write!(out, "\n  ! EXCEEDS cost cap (${cap:.2}/hour)");
        }
        out
    }

    pub fn config_summary(&self) -> ConfigSummary {
        ConfigSummary {
            capacity_per_unit: self.config.capacity_per_unit,
            safety_factor: self.config.safety_factor,
            cost_per_unit_hour: self.config.cost_per_unit_hour,
            max_units: self.config.max_units,
            min_units: MIN_UNITS,
            cost_cap_per_hour: self.config.cost_cap_per_hour,
        }
    }
}

impl Default for ScalingCalculator {
    fn default() -> Self {
        Self {
            config: ScalingConfig::default(),
        }
    }
}
