//! Seasonal baseline: an hour-of-day lookup table learned from in-period
//! rows. Used as the conservative magnitude source when the learned
//! patterns are not trusted.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};
use crescent_core::{EnrichedSeries, stats};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, ForecastResult};

const MIN_HOUR_CONFIDENCE: f64 = 0.5;
const MAX_HOUR_CONFIDENCE: f64 = 0.99;
const PEAK_HOURS_REPORTED: usize = 5;

/// Statistics of one hour-of-day bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourStats {
    pub mean: f64,
    pub median: f64,
    /// Sample std-dev; `None` for a single-sample bucket.
    pub std: Option<f64>,
    pub p25: f64,
    pub p75: f64,
    pub count: usize,
}

impl HourStats {
    fn from_values(values: &[f64]) -> Option<Self> {
        Some(Self {
            mean: stats::mean(values)?,
            median: stats::median(values)?,
            std: stats::std_dev(values, 1),
            p25: stats::quantile(values, 0.25)?,
            p75: stats::quantile(values, 0.75)?,
            count: stats::present(values).len(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSummary {
    pub hours_covered: usize,
    /// Up to five `(hour, multiplier)` pairs, highest multiplier first.
    pub peak_hours: Vec<(u32, f64)>,
    pub avg_confidence: f64,
    pub total_samples: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonalBaseline {
    hours: BTreeMap<u32, HourStats>,
    trained: bool,
}

impl SeasonalBaseline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the hour table from the in-period rows of `series`.
    ///
    /// Fails with [`ForecastError::NoInPeriodData`] when there are none; the
    /// previous table is kept in that case.
    pub fn train(&mut self, series: &EnrichedSeries) -> ForecastResult<()> {
        let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        let mut rows = 0usize;
        for row in series.in_period() {
            buckets.entry(row.hour).or_default().push(row.value);
            rows += 1;
        }
        if rows == 0 {
            return Err(ForecastError::NoInPeriodData);
        }

        self.hours = buckets
            .into_iter()
            .filter_map(|(hour, values)| HourStats::from_values(&values).map(|s| (hour, s)))
            .collect();
        self.trained = true;

        debug!(rows, hours = self.hours.len(), "seasonal baseline trained");
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    pub fn hour_stats(&self, hour: u32) -> Option<&HourStats> {
        self.hours.get(&hour)
    }

    /// Predicted traffic at `timestamp`'s hour.
    ///
    /// ```text
    /// untrained hour           → current traffic, or 0
    /// no / zero current        → hour median
    /// otherwise                → max(0, current × multiplier(hour))
    /// ```
    pub fn predict(&self, timestamp: NaiveDateTime, current: Option<f64>) -> ForecastResult<f64> {
        if !self.trained {
            return Err(ForecastError::NotTrained);
        }
        let hour = timestamp.hour();
        let Some(bucket) = self.hours.get(&hour) else {
            return Ok(current.unwrap_or(0.0));
        };
        match current {
            None => Ok(bucket.median),
            Some(c) if c == 0.0 => Ok(bucket.median),
            Some(c) => Ok((c * self.multiplier(hour)).max(0.0)),
        }
    }

    /// Hour median relative to the median of all hour medians.
    pub fn multiplier(&self, hour: u32) -> f64 {
        let Some(bucket) = self.hours.get(&hour) else {
            return 1.0;
        };
        let medians: Vec<f64> = self.hours.values().map(|s| s.median).collect();
        match stats::median(&medians) {
            Some(m) if m != 0.0 => bucket.median / m,
            _ => 1.0,
        }
    }

    /// `clamp(1 - std/mean, 0.5, 0.99)`; 0.5 for unknown hours, zero means,
    /// and single-sample buckets.
    pub fn confidence(&self, hour: u32) -> f64 {
        let Some(bucket) = self.hours.get(&hour) else {
            return MIN_HOUR_CONFIDENCE;
        };
        match bucket.std {
            Some(std) if bucket.mean != 0.0 => {
                let cv = std / bucket.mean;
                if cv.is_finite() {
                    (1.0 - cv).clamp(MIN_HOUR_CONFIDENCE, MAX_HOUR_CONFIDENCE)
                } else {
                    MIN_HOUR_CONFIDENCE
                }
            }
            _ => MIN_HOUR_CONFIDENCE,
        }
    }

    /// `None` before training.
    pub fn summary(&self) -> Option<BaselineSummary> {
        if !self.trained {
            return None;
        }

        let mut peak_hours: Vec<(u32, f64)> =
            self.hours.keys().map(|&h| (h, self.multiplier(h))).collect();
        peak_hours.sort_by(|a, b| b.1.total_cmp(&a.1));
        peak_hours.truncate(PEAK_HOURS_REPORTED);

        let confidences: Vec<f64> = self.hours.keys().map(|&h| self.confidence(h)).collect();

        Some(BaselineSummary {
            hours_covered: self.hours.len(),
            peak_hours,
            avg_confidence: stats::mean(&confidences).unwrap_or(0.0),
            total_samples: self.hours.values().map(|s| s.count).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use crescent_core::{FeatureDeriver, FeatureOptions, Sample, TimeSeries};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn enriched(start: NaiveDateTime, hours: i64, value: impl Fn(i64) -> f64) -> EnrichedSeries {
        let samples = (0..hours)
            .map(|i| Sample::new(start + Duration::hours(i), value(i)))
            .collect();
        FeatureDeriver::default()
            .derive(
                &TimeSeries::new(samples).unwrap(),
                &FeatureOptions::for_year(2026).keep_all_rows().with_interval(60),
            )
            .unwrap()
    }

    /// Three in-period days; hour 19 is four times busier than the rest.
    fn trained() -> SeasonalBaseline {
        let series = enriched(at(17, 0), 72, |i| if i % 24 == 19 { 400.0 } else { 100.0 });
        let mut model = SeasonalBaseline::new();
        model.train(&series).unwrap();
        model
    }

    #[test]
    fn train_without_in_period_rows_fails() {
        let series = enriched(at(1, 0), 48, |_| 100.0);
        let mut model = SeasonalBaseline::new();
        assert!(matches!(model.train(&series), Err(ForecastError::NoInPeriodData)));
        assert!(!model.is_trained());
    }

    #[test]
    fn predict_before_training_fails() {
        let err = SeasonalBaseline::new().predict(at(20, 19), None).unwrap_err();
        assert!(matches!(err, ForecastError::NotTrained));
    }

    #[test]
    fn hour_stats_are_learned() {
        let model = trained();
        let h19 = model.hour_stats(19).unwrap();
        assert_eq!(h19.count, 3);
        assert_eq!(h19.median, 400.0);
        assert_eq!(h19.std, Some(0.0));
        assert_eq!(model.multiplier(19), 4.0);
        assert_eq!(model.multiplier(3), 1.0);
    }

    #[test]
    fn predict_follows_current_traffic() {
        let model = trained();
        assert_eq!(model.predict(at(20, 19), None).unwrap(), 400.0);
        assert_eq!(model.predict(at(20, 19), Some(0.0)).unwrap(), 400.0);
        assert_eq!(model.predict(at(20, 19), Some(50.0)).unwrap(), 200.0);
        assert_eq!(model.predict(at(20, 19), Some(-50.0)).unwrap(), 0.0);
    }

    #[test]
    fn untrained_hour_passes_current_through() {
        // Only hours 0..=5 of day one.
        let series = enriched(at(17, 0), 6, |_| 100.0);
        let mut model = SeasonalBaseline::new();
        model.train(&series).unwrap();

        assert_eq!(model.predict(at(20, 19), Some(42.0)).unwrap(), 42.0);
        assert_eq!(model.predict(at(20, 19), None).unwrap(), 0.0);
        assert_eq!(model.multiplier(19), 1.0);
        assert_eq!(model.confidence(19), 0.5);
    }

    #[test]
    fn confidence_from_variation() {
        let model = trained();
        assert_eq!(model.confidence(19), 0.99);

        // One sample per hour: std undefined.
        let series = enriched(at(17, 0), 24, |_| 100.0);
        let mut single = SeasonalBaseline::new();
        single.train(&series).unwrap();
        assert_eq!(single.confidence(10), 0.5);

        let series = enriched(at(17, 0), 48, |i| if i < 24 { 0.0 } else { 100.0 });
        let mut noisy = SeasonalBaseline::new();
        noisy.train(&series).unwrap();
        // mean 50, std ≈ 70.7
        assert_eq!(noisy.confidence(10), 0.5);
    }

    #[test]
    fn retraining_replaces_the_table() {
        let mut model = trained();
        model.train(&enriched(at(17, 0), 6, |_| 10.0)).unwrap();
        assert!(model.hour_stats(19).is_none());
        assert_eq!(model.hour_stats(0).unwrap().median, 10.0);
    }

    #[test]
    fn summary_lists_peak_hours_first() {
        assert!(SeasonalBaseline::new().summary().is_none());

        let summary = trained().summary().unwrap();
        assert_eq!(summary.hours_covered, 24);
        assert_eq!(summary.total_samples, 72);
        assert_eq!(summary.peak_hours.len(), 5);
        assert_eq!(summary.peak_hours[0], (19, 4.0));
        assert_eq!(summary.avg_confidence, 0.99);
    }
}
