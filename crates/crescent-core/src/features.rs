//! Feature derivation — `TimeSeries` → `EnrichedSeries`.
//!
//! # Derived fields
//!
//! ```text
//! calendar   hour, day_of_week, day_of_month, is_weekend
//! period     is_event_period, event_day (0 | 1..=N), is_last_phase
//! windows    one flag per SurgeWindow (inclusive hour ranges)
//! lags       value shifted by 1h, 24h, 7d worth of rows
//! rolling    trailing 1h mean/std/max/min, trailing 24h mean (min periods 1)
//! ```
//!
//! Row counts for lags and windows are `60 / interval`, `1440 / interval`
//! and `10080 / interval`, where `interval` is the sampling interval in
//! minutes.

use chrono::{Datelike, Timelike};
use tracing::debug;

use crate::calendar::{EventCalendar, SurgeWindow};
use crate::error::{CoreError, CoreResult};
use crate::series::{EnrichedRow, EnrichedSeries, TimeSeries};
use crate::stats;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 1_440;
const MINUTES_PER_WEEK: u32 = 10_080;

/// Options for a single derivation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureOptions {
    /// Calendar year to resolve the event period against. Inferred from the
    /// series when `None`.
    pub year: Option<i32>,
    /// Drop rows whose lag fields are still undefined.
    pub fill_missing: bool,
    pub sample_interval_minutes: u32,
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self {
            year: None,
            fill_missing: true,
            sample_interval_minutes: 1,
        }
    }
}

impl FeatureOptions {
    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }

    pub fn keep_all_rows(mut self) -> Self {
        self.fill_missing = false;
        self
    }

    pub fn with_interval(mut self, minutes: u32) -> Self {
        self.sample_interval_minutes = minutes;
        self
    }
}

/// Derives calendar-aware features from a raw series.
#[derive(Debug, Clone, Default)]
pub struct FeatureDeriver {
    calendar: EventCalendar,
}

impl FeatureDeriver {
    pub fn new(calendar: EventCalendar) -> Self {
        Self { calendar }
    }

    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    /// Derive the enriched view of `series`. The input is left untouched.
    pub fn derive(&self, series: &TimeSeries, options: &FeatureOptions) -> CoreResult<EnrichedSeries> {
        let interval = options.sample_interval_minutes;
        if !(1..=MINUTES_PER_HOUR).contains(&interval) {
            return Err(CoreError::InvalidSampleInterval(interval));
        }

        let year = match options.year {
            Some(year) => year,
            None => infer_year(series, &self.calendar)?,
        };
        let period = self.calendar.period_for(year);

        let shift_1h = (MINUTES_PER_HOUR / interval) as usize;
        let shift_24h = (MINUTES_PER_DAY / interval) as usize;
        let shift_7d = (MINUTES_PER_WEEK / interval) as usize;

        let values = series.values();
        let mut day_window = RollingMean::new(shift_24h);
        let mut rows = Vec::with_capacity(series.len());

        for (i, sample) in series.samples().iter().enumerate() {
            let ts = sample.timestamp;
            let hour = ts.hour();
            let day_of_week = ts.weekday().num_days_from_monday();
            let event_day = period.day_index(ts.date()).unwrap_or(0);

            let hour_slice = &values[(i + 1).saturating_sub(shift_1h)..=i];
            day_window.push(sample.value);

            rows.push(EnrichedRow {
                timestamp: ts,
                value: sample.value,
                hour,
                day_of_week,
                day_of_month: ts.day(),
                is_weekend: day_of_week >= 5,
                is_event_period: event_day > 0,
                event_day,
                is_last_phase: period.is_last_phase(event_day),
                in_window: SurgeWindow::ALL.map(|w| w.contains_hour(hour)),
                lag_1h: lagged(&values, i, shift_1h),
                lag_24h: lagged(&values, i, shift_24h),
                lag_7d: lagged(&values, i, shift_7d),
                rolling_mean_1h: stats::mean(hour_slice),
                rolling_std_1h: stats::std_dev(hour_slice, 1),
                rolling_max_1h: stats::max(hour_slice),
                rolling_min_1h: stats::min(hour_slice),
                rolling_mean_24h: day_window.mean(),
            });
        }

        let derived = rows.len();
        if options.fill_missing {
            rows.retain(EnrichedRow::has_all_lags);
        }

        debug!(
            year,
            interval,
            derived,
            kept = rows.len(),
            fill_missing = options.fill_missing,
            "features derived"
        );

        Ok(EnrichedSeries::new(rows, year, interval))
    }
}

/// Year of a single-year series; an empty series resolves to the
/// calendar's default year.
fn infer_year(series: &TimeSeries, calendar: &EventCalendar) -> CoreResult<i32> {
    let years = series.years();
    match years.as_slice() {
        [] => Ok(calendar.default_year()),
        [year] => Ok(*year),
        _ => Err(CoreError::MultiYearSeries(years)),
    }
}

fn lagged(values: &[f64], i: usize, shift: usize) -> Option<f64> {
    i.checked_sub(shift)
        .map(|j| values[j])
        .filter(|v| !v.is_nan())
}

/// Trailing mean over a fixed number of rows, skipping missing values.
struct RollingMean {
    size: usize,
    buf: std::collections::VecDeque<f64>,
    sum: f64,
    present: usize,
}

impl RollingMean {
    fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            buf: std::collections::VecDeque::with_capacity(size.max(1)),
            sum: 0.0,
            present: 0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.buf.len() == self.size
            && let Some(old) = self.buf.pop_front()
            && !old.is_nan()
        {
            self.sum -= old;
            self.present -= 1;
        }
        if !value.is_nan() {
            self.sum += value;
            self.present += 1;
        }
        self.buf.push_back(value);
    }

    fn mean(&self) -> Option<f64> {
        (self.present > 0).then(|| self.sum / self.present as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Sample;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn minutely(start: NaiveDateTime, n: usize, f: impl Fn(usize) -> f64) -> TimeSeries {
        TimeSeries::new(
            (0..n)
                .map(|i| Sample::new(start + Duration::minutes(i as i64), f(i)))
                .collect(),
        )
        .unwrap()
    }

    fn feb(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn seven_day_lag_matches_raw_value() {
        let series = minutely(feb(1), 10_080 + 30, |i| i as f64);
        let enriched = FeatureDeriver::default()
            .derive(&series, &FeatureOptions::default())
            .unwrap();

        // Only rows with a full week of history survive.
        assert_eq!(enriched.len(), 30);
        for row in enriched.rows() {
            let idx = (row.timestamp - feb(1)).num_minutes() as f64;
            assert_eq!(row.lag_7d, Some(idx - 10_080.0));
            assert_eq!(row.lag_24h, Some(idx - 1_440.0));
            assert_eq!(row.lag_1h, Some(idx - 60.0));
        }
    }

    #[test]
    fn rolling_mean_uses_partial_window() {
        let series = minutely(feb(1), 120, |i| (i % 7) as f64);
        let values = series.values();
        let enriched = FeatureDeriver::default()
            .derive(&series, &FeatureOptions::default().keep_all_rows())
            .unwrap();

        for (n, row) in enriched.rows().iter().enumerate() {
            let start = (n + 1).saturating_sub(60);
            let window = &values[start..=n];
            let expected = window.iter().sum::<f64>() / window.len() as f64;
            assert!((row.rolling_mean_1h.unwrap() - expected).abs() < 1e-9, "row {n}");
        }
        assert_eq!(enriched.rows()[0].rolling_std_1h, None);
        assert!(enriched.rows()[1].rolling_std_1h.is_some());
    }

    #[test]
    fn calendar_fields_follow_event_period() {
        let series = minutely(feb(16), 3 * 1_440, |_| 1.0);
        let enriched = FeatureDeriver::default()
            .derive(&series, &FeatureOptions::default().keep_all_rows())
            .unwrap();

        let first = &enriched.rows()[0];
        assert!(!first.is_event_period);
        assert_eq!(first.event_day, 0);

        let day_one = &enriched.rows()[1_440];
        assert!(day_one.is_event_period);
        assert_eq!(day_one.event_day, 1);
        assert!(!day_one.is_last_phase);
        assert_eq!(enriched.rows()[2 * 1_440].event_day, 2);
    }

    #[test]
    fn surge_windows_are_inclusive_hour_ranges() {
        let series = minutely(feb(20), 1_440, |_| 1.0);
        let enriched = FeatureDeriver::default()
            .derive(&series, &FeatureOptions::default().keep_all_rows())
            .unwrap();

        let at_hour = |h: usize| &enriched.rows()[h * 60];
        assert!(at_hour(3).in_surge_window(SurgeWindow::DawnMeal));
        assert!(at_hour(5).in_surge_window(SurgeWindow::DawnMeal));
        assert!(!at_hour(6).in_surge_window(SurgeWindow::DawnMeal));
        assert!(at_hour(20).in_surge_window(SurgeWindow::BreakingFast));
        assert!(at_hour(20).in_surge_window(SurgeWindow::NightPrayer));
    }

    #[test]
    fn coarser_interval_scales_shifts() {
        let start = feb(1);
        let series = TimeSeries::new(
            (0..(24 * 8))
                .map(|i| Sample::new(start + Duration::hours(i as i64), i as f64))
                .collect(),
        )
        .unwrap();
        let enriched = FeatureDeriver::default()
            .derive(&series, &FeatureOptions::default().with_interval(60))
            .unwrap();

        assert_eq!(enriched.len(), 24);
        let row = &enriched.rows()[0];
        assert_eq!(row.value, 168.0);
        assert_eq!(row.lag_1h, Some(167.0));
        assert_eq!(row.lag_7d, Some(0.0));
    }

    #[test]
    fn multi_year_series_without_year_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 12, 31)
            .unwrap()
            .and_hms_opt(23, 30, 0)
            .unwrap();
        let series = minutely(start, 60, |_| 1.0);

        let err = FeatureDeriver::default()
            .derive(&series, &FeatureOptions::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::MultiYearSeries(ref y) if y == &vec![2025, 2026]));

        // An explicit year resolves the ambiguity.
        assert!(
            FeatureDeriver::default()
                .derive(&series, &FeatureOptions::for_year(2026))
                .is_ok()
        );
    }

    #[test]
    fn invalid_interval_is_rejected() {
        let series = minutely(feb(1), 10, |_| 1.0);
        for interval in [0, 61] {
            let err = FeatureDeriver::default()
                .derive(&series, &FeatureOptions::default().with_interval(interval))
                .unwrap_err();
            assert!(matches!(err, CoreError::InvalidSampleInterval(i) if i == interval));
        }
    }

    #[test]
    fn derive_leaves_input_untouched() {
        let series = minutely(feb(1), 90, |i| i as f64);
        let before = series.clone();
        let _ = FeatureDeriver::default().derive(&series, &FeatureOptions::default());
        assert_eq!(series, before);
    }

    #[test]
    fn empty_series_yields_empty_enriched_series() {
        let enriched = FeatureDeriver::default()
            .derive(&TimeSeries::default(), &FeatureOptions::default())
            .unwrap();
        assert!(enriched.is_empty());
        assert_eq!(enriched.year(), 2026);
    }
}
