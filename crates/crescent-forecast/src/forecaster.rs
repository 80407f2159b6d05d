//! Hybrid forecaster.
//!
//! Each surge window has a fixed trigger hour. When the clock is at a
//! window's trigger hour inside the event period, the forecaster emits one
//! [`EventForecast`] for that window:
//!
//! ```text
//! baseline   = SeasonalBaseline.predict(representative date @ event hour)
//! learned    = pattern.multiplier_mean (1.5 if unlearned) × day factor
//! confidence = ConfidenceScorer(window, pattern confidence, data quality, …)
//! predicted  = baseline × learned                 if confidence ≥ 0.70
//!            = baseline × baseline.multiplier(h)  otherwise
//! ```

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use crescent_core::{EnrichedSeries, EventCalendar, FeatureDeriver, FeatureOptions, SurgeWindow, Tabular, TimeSeries};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::baseline::{BaselineSummary, SeasonalBaseline};
use crate::confidence::{ConfidenceInputs, ConfidenceScorer};
use crate::error::{ForecastError, ForecastResult};
use crate::patterns::{LearnedPatterns, PatternSummary};

/// Events further away than this are not forecast.
pub const FORECAST_HORIZON_HOURS: u32 = 4;

/// Multiplier assumed for a window with no learned pattern.
pub const DEFAULT_SURGE_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MODEL_CONFIDENCE: f64 = 0.8;
pub const DEFAULT_DATA_QUALITY: f64 = 0.8;

/// Used when the seasonal baseline cannot produce a prediction.
pub const FALLBACK_BASELINE_TRAFFIC: f64 = 100.0;

/// When to forecast a surge window and which hour it peaks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    pub window: SurgeWindow,
    pub trigger_hour: u32,
    pub event_hour: u32,
    pub window_hours: (u32, u32),
}

pub const TRIGGER_RULES: [TriggerRule; 3] = [
    TriggerRule {
        window: SurgeWindow::DawnMeal,
        trigger_hour: 2,
        event_hour: 4,
        window_hours: SurgeWindow::DawnMeal.hours(),
    },
    TriggerRule {
        window: SurgeWindow::BreakingFast,
        trigger_hour: 15,
        event_hour: 18,
        window_hours: SurgeWindow::BreakingFast.hours(),
    },
    TriggerRule {
        window: SurgeWindow::NightPrayer,
        trigger_hour: 17,
        event_hour: 20,
        window_hours: SurgeWindow::NightPrayer.hours(),
    },
];

impl TriggerRule {
    /// Hours from `hour` forward to the event hour, wrapping at midnight.
    pub fn hours_until_event(&self, hour: u32) -> u32 {
        (self.event_hour + 24 - hour % 24) % 24
    }

    fn fires_at(&self, hour: u32) -> bool {
        hour == self.trigger_hour && self.hours_until_event(hour) <= FORECAST_HORIZON_HOURS
    }
}

/// One forecast for an upcoming surge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventForecast {
    pub event: SurgeWindow,
    pub event_day: Option<u32>,
    pub predicted_traffic: f64,
    /// In `[0.5, 0.99]`.
    pub confidence: f64,
    pub time_to_impact_hours: f64,
    pub trigger_time: NaiveDateTime,
    pub event_time: NaiveDateTime,
    pub baseline_traffic: f64,
    pub multiplier: f64,
    /// `true` when the learned multiplier was used, `false` for the
    /// seasonal-baseline fallback.
    pub used_learned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ModelSummary {
    Untrained,
    Trained {
        baseline: Option<BaselineSummary>,
        patterns: PatternSummary,
        forecast_horizon_hours: u32,
        trigger_rules: Vec<TriggerRule>,
    },
}

impl ModelSummary {
    pub fn is_trained(&self) -> bool {
        matches!(self, ModelSummary::Trained { .. })
    }
}

/// Rule-timed, confidence-gated forecaster for one tenant.
///
/// Instances share nothing; each tenant trains and persists its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridForecaster {
    calendar: EventCalendar,
    baseline: SeasonalBaseline,
    patterns: LearnedPatterns,
    scorer: ConfidenceScorer,
    trained: bool,
}

impl Default for HybridForecaster {
    fn default() -> Self {
        Self::new(EventCalendar::default())
    }
}

impl HybridForecaster {
    pub fn new(calendar: EventCalendar) -> Self {
        Self {
            calendar,
            baseline: SeasonalBaseline::new(),
            patterns: LearnedPatterns::default(),
            scorer: ConfidenceScorer::new(),
            trained: false,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    pub fn baseline(&self) -> &SeasonalBaseline {
        &self.baseline
    }

    pub fn patterns(&self) -> &LearnedPatterns {
        &self.patterns
    }

    pub fn scorer(&self) -> &ConfidenceScorer {
        &self.scorer
    }

    /// Train the seasonal baseline and learn patterns from `series`.
    ///
    /// On error the forecaster keeps its previous state.
    pub fn train(&mut self, series: &EnrichedSeries) -> ForecastResult<()> {
        let mut baseline = SeasonalBaseline::new();
        baseline.train(series)?;
        let patterns = LearnedPatterns::learn(series);

        info!(
            rows = series.len(),
            year = series.year(),
            windows = patterns.surge_patterns.len(),
            days = patterns.daily_patterns.len(),
            "forecaster trained"
        );

        self.baseline = baseline;
        self.patterns = patterns;
        self.trained = true;
        Ok(())
    }

    /// Derive features from a raw series with this forecaster's calendar,
    /// then train on them.
    pub fn train_series(&mut self, series: &TimeSeries, options: &FeatureOptions) -> ForecastResult<()> {
        let enriched = FeatureDeriver::new(self.calendar.clone()).derive(series, options)?;
        self.train(&enriched)
    }

    /// Forecasts for every window whose trigger hour is `now`'s hour.
    ///
    /// Empty outside the event period. `history`, when given, feeds the
    /// data-quality factor.
    pub fn forecast(
        &self,
        now: NaiveDateTime,
        current_traffic: f64,
        history: Option<&dyn Tabular>,
    ) -> ForecastResult<Vec<EventForecast>> {
        if !self.trained {
            return Err(ForecastError::NotTrained);
        }

        let year = now.year();
        if !self.calendar.is_in_period(now, year) {
            debug!(%now, "outside event period, nothing to forecast");
            return Ok(Vec::new());
        }
        let event_day = self.calendar.day_index(now, year);

        let forecasts: Vec<EventForecast> = TRIGGER_RULES
            .iter()
            .filter(|rule| rule.fires_at(now.hour()))
            .map(|rule| self.forecast_event(rule, now, event_day, history))
            .collect();

        debug!(%now, current_traffic, ?event_day, forecasts = forecasts.len(), "forecast tick");
        Ok(forecasts)
    }

    fn forecast_event(
        &self,
        rule: &TriggerRule,
        now: NaiveDateTime,
        event_day: Option<u32>,
        history: Option<&dyn Tabular>,
    ) -> EventForecast {
        let event_time = next_occurrence(now, rule.event_hour);
        let data_quality = self.data_quality(history);
        let baseline_traffic = self.baseline_prediction(rule.event_hour);
        let learned = self.learned_multiplier(rule.window, event_day);

        let pattern = self.patterns.surge_pattern(rule.window);
        let model_confidence = pattern.map_or(DEFAULT_MODEL_CONFIDENCE, |p| p.confidence);
        let sample_size = pattern.map(|p| p.sample_size as i64);

        let confidence = self.scorer.calculate(&ConfidenceInputs {
            event_name: rule.window.name(),
            model_confidence,
            data_quality,
            event_day: event_day.map(i64::from),
            hour: Some(i64::from(rule.event_hour)),
            sample_size,
        });

        let used_learned = self.scorer.should_use_ml(confidence);
        let multiplier = if used_learned {
            learned
        } else {
            self.baseline.multiplier(rule.event_hour)
        };

        EventForecast {
            event: rule.window,
            event_day,
            predicted_traffic: baseline_traffic * multiplier,
            confidence,
            time_to_impact_hours: (event_time - now).num_seconds() as f64 / 3600.0,
            trigger_time: now,
            event_time,
            baseline_traffic,
            multiplier,
            used_learned,
        }
    }

    fn data_quality(&self, history: Option<&dyn Tabular>) -> f64 {
        let Some(table) = history else {
            return DEFAULT_DATA_QUALITY;
        };
        match self.scorer.data_quality(table, None) {
            Ok(q) => q,
            Err(e) => {
                warn!(error = %e, "data quality unavailable, using default");
                DEFAULT_DATA_QUALITY
            }
        }
    }

    /// Baseline at `hour` on a fixed in-period date, so the result does not
    /// drift with the query date.
    fn baseline_prediction(&self, hour: u32) -> f64 {
        let at = representative_date().and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour));
        match self.baseline.predict(at, None) {
            Ok(traffic) => traffic,
            Err(e) => {
                warn!(hour, error = %e, "baseline prediction failed, using fallback");
                FALLBACK_BASELINE_TRAFFIC
            }
        }
    }

    fn learned_multiplier(&self, window: SurgeWindow, event_day: Option<u32>) -> f64 {
        let base = self
            .patterns
            .surge_pattern(window)
            .map_or(DEFAULT_SURGE_MULTIPLIER, |p| p.multiplier_mean);
        match event_day {
            Some(day) => base * self.patterns.day_adjustment_factor(i64::from(day)),
            None => base,
        }
    }

    pub fn model_summary(&self) -> ModelSummary {
        if !self.trained {
            return ModelSummary::Untrained;
        }
        ModelSummary::Trained {
            baseline: self.baseline.summary(),
            patterns: self.patterns.summary(),
            forecast_horizon_hours: FORECAST_HORIZON_HOURS,
            trigger_rules: TRIGGER_RULES.to_vec(),
        }
    }
}

fn representative_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 20).unwrap_or(NaiveDate::MIN)
}

/// `hour:00` today, or tomorrow if that is not after `now`.
fn next_occurrence(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let today = now.date().and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour));
    if today <= now {
        today + Duration::days(1)
    } else {
        today
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn trigger_rules_fire_once_per_window() {
        for rule in TRIGGER_RULES {
            let firing: Vec<u32> = (0..24).filter(|&h| rule.fires_at(h)).collect();
            assert_eq!(firing, vec![rule.trigger_hour], "{}", rule.window);
            assert!(rule.hours_until_event(rule.trigger_hour) <= FORECAST_HORIZON_HOURS);
        }
    }

    #[test]
    fn hours_until_event_wraps() {
        let dawn = TRIGGER_RULES[0];
        assert_eq!(dawn.hours_until_event(2), 2);
        assert_eq!(dawn.hours_until_event(23), 5);
        assert_eq!(dawn.hours_until_event(4), 0);
    }

    #[test]
    fn next_occurrence_rolls_over() {
        assert_eq!(next_occurrence(at(2, 20, 15, 30), 18), at(2, 20, 18, 0));
        assert_eq!(next_occurrence(at(2, 20, 18, 0), 18), at(2, 21, 18, 0));
        assert_eq!(next_occurrence(at(2, 20, 23, 0), 4), at(2, 21, 4, 0));
    }

    #[test]
    fn forecast_requires_training() {
        let err = HybridForecaster::default()
            .forecast(at(2, 20, 15, 0), 100.0, None)
            .unwrap_err();
        assert!(matches!(err, ForecastError::NotTrained));
        assert_eq!(HybridForecaster::default().model_summary(), ModelSummary::Untrained);
    }

    #[test]
    fn failed_training_keeps_previous_state() {
        let mut forecaster = HybridForecaster::default();
        let err = forecaster.train(&EnrichedSeries::default()).unwrap_err();
        assert!(matches!(err, ForecastError::NoInPeriodData));
        assert!(!forecaster.is_trained());
    }

    #[test]
    fn untrained_baseline_uses_fallback_traffic() {
        let forecaster = HybridForecaster::default();
        assert_eq!(forecaster.baseline_prediction(18), FALLBACK_BASELINE_TRAFFIC);
        assert_eq!(
            forecaster.learned_multiplier(SurgeWindow::BreakingFast, None),
            DEFAULT_SURGE_MULTIPLIER
        );
        assert_eq!(
            forecaster.learned_multiplier(SurgeWindow::BreakingFast, Some(25)),
            DEFAULT_SURGE_MULTIPLIER * 1.25
        );
    }
}
