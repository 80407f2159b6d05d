//! Multi-factor confidence scoring.
//!
//! ```text
//! factor        weight   value
//! base          0.20     per-event prior (breaking-fast 0.85 … other 0.70)
//! model         0.35     clamp(model_confidence, 0, 1)
//! quality       0.25     clamp(data_quality, 0, 1)
//! progression   0.10     0.6 / 0.8 / 1.0 by tertile, 0.5 without a day
//! time of day   0.07     1.0 surge hours, 0.8 midday, 0.6 other, 0.7 unknown
//! sample size   0.03     0.7 unknown, 0.3 invalid, 0.4 / 0.6 / 0.8 / 1.0
//! ```
//!
//! The weighted sum is clamped to `[0.5, 0.99]`.

use std::fmt;

use crescent_core::{SurgeWindow, Tabular};
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, ForecastResult};

pub const MIN_CONFIDENCE: f64 = 0.5;
pub const MAX_CONFIDENCE: f64 = 0.99;

/// Scores at or above this favour the learned multiplier.
pub const ML_THRESHOLD: f64 = 0.70;

const GENERIC_BASE_CONFIDENCE: f64 = 0.70;

const WEIGHT_BASE: f64 = 0.20;
const WEIGHT_MODEL: f64 = 0.35;
const WEIGHT_QUALITY: f64 = 0.25;
const WEIGHT_PROGRESSION: f64 = 0.10;
const WEIGHT_TIME: f64 = 0.07;
const WEIGHT_SAMPLE: f64 = 0.03;

const SURGE_HOURS: [i64; 7] = [3, 4, 5, 18, 19, 20, 21];
const MIDDAY_HOURS: [i64; 5] = [10, 11, 12, 13, 14];

/// Inputs to [`ConfidenceScorer::calculate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceInputs<'a> {
    /// Surge window name or alias; anything else scores as a generic event.
    pub event_name: &'a str,
    pub model_confidence: f64,
    pub data_quality: f64,
    pub event_day: Option<i64>,
    pub hour: Option<i64>,
    pub sample_size: Option<i64>,
}

impl<'a> ConfidenceInputs<'a> {
    pub fn new(event_name: &'a str, model_confidence: f64, data_quality: f64) -> Self {
        Self {
            event_name,
            model_confidence,
            data_quality,
            event_day: None,
            hour: None,
            sample_size: None,
        }
    }

    pub fn on_day(mut self, day: i64) -> Self {
        self.event_day = Some(day);
        self
    }

    pub fn at_hour(mut self, hour: i64) -> Self {
        self.hour = Some(hour);
        self
    }

    pub fn with_samples(mut self, n: i64) -> Self {
        self.sample_size = Some(n);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    pub fn from_score(confidence: f64) -> Self {
        if confidence >= 0.9 {
            ConfidenceLevel::VeryHigh
        } else if confidence >= 0.8 {
            ConfidenceLevel::High
        } else if confidence >= 0.7 {
            ConfidenceLevel::Medium
        } else if confidence >= 0.6 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "very_high",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very_low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless scorer; all methods are pure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn new() -> Self {
        Self
    }

    /// Weighted blend of the six factors, clamped to `[0.5, 0.99]`.
    pub fn calculate(&self, inputs: &ConfidenceInputs<'_>) -> f64 {
        let model = unit(inputs.model_confidence);
        let quality = unit(inputs.data_quality);

        let score = event_base_confidence(inputs.event_name) * WEIGHT_BASE
            + model * WEIGHT_MODEL
            + quality * WEIGHT_QUALITY
            + progression_boost(inputs.event_day) * WEIGHT_PROGRESSION
            + time_boost(inputs.hour) * WEIGHT_TIME
            + sample_boost(inputs.sample_size) * WEIGHT_SAMPLE;

        score.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
    }

    /// Completeness of `table` over `required` columns (all columns when
    /// `None`).
    ///
    /// `1 - missing/total`, then ×0.6 above 20% missing or ×0.8 above 10%.
    /// Empty tables score 0.0.
    pub fn data_quality(
        &self,
        table: &dyn Tabular,
        required: Option<&[&str]>,
    ) -> ForecastResult<f64> {
        if table.row_count() == 0 {
            return Ok(0.0);
        }

        let columns: Vec<&str> = match required {
            Some(cols) => cols.to_vec(),
            None => table.column_names(),
        };

        let mut absent = Vec::new();
        let mut missing = 0usize;
        for col in &columns {
            match table.missing_in(col) {
                Some(n) => missing += n,
                None => absent.push((*col).to_string()),
            }
        }
        if !absent.is_empty() {
            absent.sort();
            absent.dedup();
            return Err(ForecastError::MissingColumns(absent));
        }

        let total = table.row_count() * columns.len();
        let missing_pct = if total > 0 {
            missing as f64 / total as f64
        } else {
            1.0
        };

        let mut quality = 1.0 - missing_pct;
        if missing_pct > 0.2 {
            quality *= 0.6;
        } else if missing_pct > 0.1 {
            quality *= 0.8;
        }
        Ok(quality.clamp(0.0, 1.0))
    }

    pub fn should_use_ml(&self, confidence: f64) -> bool {
        confidence >= ML_THRESHOLD
    }

    pub fn level(&self, confidence: f64) -> ConfidenceLevel {
        ConfidenceLevel::from_score(confidence)
    }
}

/// Prior confidence for an event name; case and whitespace insensitive.
pub fn event_base_confidence(event_name: &str) -> f64 {
    match event_name.parse::<SurgeWindow>() {
        Ok(SurgeWindow::BreakingFast) => 0.85,
        Ok(SurgeWindow::NightPrayer) => 0.80,
        Ok(SurgeWindow::DawnMeal) => 0.75,
        Err(_) => GENERIC_BASE_CONFIDENCE,
    }
}

/// Clamp into `[0, 1]`; NaN counts as 0.
fn unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

fn progression_boost(day: Option<i64>) -> f64 {
    match day.map(|d| d.clamp(1, 30)) {
        Some(1..=10) => 0.6,
        Some(11..=20) => 0.8,
        Some(_) => 1.0,
        None => 0.5,
    }
}

fn time_boost(hour: Option<i64>) -> f64 {
    match hour.map(|h| h.clamp(0, 23)) {
        Some(h) if SURGE_HOURS.contains(&h) => 1.0,
        Some(h) if MIDDAY_HOURS.contains(&h) => 0.8,
        Some(_) => 0.6,
        None => 0.7,
    }
}

fn sample_boost(sample_size: Option<i64>) -> f64 {
    match sample_size {
        None => 0.7,
        Some(n) if n <= 0 => 0.3,
        Some(1..=4) => 0.4,
        Some(5..=14) => 0.6,
        Some(15..=29) => 0.8,
        Some(_) => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use crescent_core::{Sample, TimeSeries};

    const SCORER: ConfidenceScorer = ConfidenceScorer;

    #[test]
    fn weights_sum_to_one() {
        let sum = WEIGHT_BASE
            + WEIGHT_MODEL
            + WEIGHT_QUALITY
            + WEIGHT_PROGRESSION
            + WEIGHT_TIME
            + WEIGHT_SAMPLE;
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn full_inputs_hit_the_upper_bound() {
        let c = SCORER.calculate(
            &ConfidenceInputs::new("breaking-fast", 1.0, 1.0)
                .on_day(25)
                .at_hour(19)
                .with_samples(30),
        );
        // 0.17 + 0.35 + 0.25 + 0.10 + 0.07 + 0.03 = 0.97
        assert!((c - 0.97).abs() < 1e-12);
    }

    #[test]
    fn minimal_inputs_hit_the_lower_bound() {
        let c = SCORER.calculate(&ConfidenceInputs::new("", 0.0, 0.0));
        assert_eq!(c, MIN_CONFIDENCE);
    }

    #[test]
    fn score_is_always_within_bounds() {
        let names = ["iftar", "SUHOOR ", "night_prayer", "bogus", ""];
        let extremes = [f64::NAN, -5.0, 0.0, 0.5, 1.0, 7.0, f64::INFINITY];
        let ints = [None, Some(i64::MIN), Some(-1), Some(0), Some(12), Some(99), Some(i64::MAX)];

        for name in names {
            for &m in &extremes {
                for &q in &extremes {
                    for &d in &ints {
                        let c = SCORER.calculate(&ConfidenceInputs {
                            event_name: name,
                            model_confidence: m,
                            data_quality: q,
                            event_day: d,
                            hour: d,
                            sample_size: d,
                        });
                        assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&c), "{name} {m} {q} {d:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn event_names_are_normalized() {
        assert_eq!(event_base_confidence("  Iftar "), 0.85);
        assert_eq!(event_base_confidence("BREAKING-FAST"), 0.85);
        assert_eq!(event_base_confidence("taraweeh"), 0.80);
        assert_eq!(event_base_confidence("dawn_meal"), 0.75);
        assert_eq!(event_base_confidence("lunch"), 0.70);
    }

    #[test]
    fn confidence_is_monotone_in_quality_samples_and_tertile() {
        let base = ConfidenceInputs::new("iftar", 0.8, 0.8).at_hour(19);

        let by_quality: Vec<f64> = [0.0, 0.3, 0.6, 0.9, 1.0]
            .iter()
            .map(|&q| SCORER.calculate(&ConfidenceInputs { data_quality: q, ..base }))
            .collect();
        assert!(by_quality.windows(2).all(|w| w[0] <= w[1]));

        let by_samples: Vec<f64> = [1, 4, 5, 14, 15, 29, 30, 1000]
            .iter()
            .map(|&n| SCORER.calculate(&base.with_samples(n)))
            .collect();
        assert!(by_samples.windows(2).all(|w| w[0] <= w[1]));

        let d5 = SCORER.calculate(&base.on_day(5));
        let d15 = SCORER.calculate(&base.on_day(15));
        let d25 = SCORER.calculate(&base.on_day(25));
        assert!(d5 <= d15 && d15 <= d25);
    }

    #[test]
    fn invalid_sample_size_scores_below_unknown() {
        let base = ConfidenceInputs::new("iftar", 0.8, 0.8);
        let zero = SCORER.calculate(&base.with_samples(0));
        let unknown = SCORER.calculate(&base);
        let few = SCORER.calculate(&base.with_samples(2));
        assert!(zero < few && few < unknown);
    }

    #[test]
    fn ml_threshold_is_inclusive() {
        assert!(SCORER.should_use_ml(0.70));
        assert!(SCORER.should_use_ml(0.99));
        assert!(!SCORER.should_use_ml(0.6999));
    }

    #[test]
    fn levels() {
        assert_eq!(SCORER.level(0.95), ConfidenceLevel::VeryHigh);
        assert_eq!(SCORER.level(0.8), ConfidenceLevel::High);
        assert_eq!(SCORER.level(0.7), ConfidenceLevel::Medium);
        assert_eq!(SCORER.level(0.65), ConfidenceLevel::Low);
        assert_eq!(SCORER.level(0.5), ConfidenceLevel::VeryLow);
        assert_eq!(ConfidenceLevel::VeryHigh.to_string(), "very_high");
    }

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2026, 2, 17)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| Sample::new(start + Duration::minutes(i as i64), v))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn data_quality_penalizes_gaps() {
        let complete = series(&[1.0; 10]);
        assert_eq!(SCORER.data_quality(&complete, None).unwrap(), 1.0);

        let mut v = [1.0; 20];
        v[0] = f64::NAN;
        v[1] = f64::NAN;
        v[2] = f64::NAN;
        // 15% missing: 0.85 × 0.8
        let q = SCORER.data_quality(&series(&v), None).unwrap();
        assert!((q - 0.68).abs() < 1e-12);

        let mut v = [1.0; 10];
        v[..3].fill(f64::NAN);
        // 30% missing: 0.7 × 0.6
        let q = SCORER.data_quality(&series(&v), Some(&["value"])).unwrap();
        assert!((q - 0.42).abs() < 1e-12);
    }

    #[test]
    fn data_quality_of_empty_table_is_zero() {
        assert_eq!(SCORER.data_quality(&TimeSeries::default(), None).unwrap(), 0.0);
    }

    #[test]
    fn data_quality_rejects_unknown_columns() {
        let err = SCORER
            .data_quality(&series(&[1.0]), Some(&["value", "zeta", "alpha"]))
            .unwrap_err();
        assert!(matches!(
            err,
            ForecastError::MissingColumns(ref cols) if cols == &vec!["alpha".to_string(), "zeta".to_string()]
        ));
    }
}
