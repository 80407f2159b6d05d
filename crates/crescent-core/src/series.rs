//! Time series and enriched series types.
//!
//! A [`TimeSeries`] is the caller-owned input: strictly increasing,
//! timezone-naive timestamps with one value each (`NaN` = missing). The
//! feature deriver never mutates it; it produces a separate
//! [`EnrichedSeries`].

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::SurgeWindow;
use crate::error::{CoreError, CoreResult};

/// One `(timestamp, value)` observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ordered series of samples with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Wrap already-ordered samples, rejecting out-of-order or duplicate
    /// timestamps.
    pub fn new(samples: Vec<Sample>) -> CoreResult<Self> {
        for (index, pair) in samples.windows(2).enumerate() {
            let (previous, timestamp) = (pair[0].timestamp, pair[1].timestamp);
            if timestamp == previous {
                return Err(CoreError::DuplicateTimestamp(timestamp));
            }
            if timestamp < previous {
                return Err(CoreError::UnorderedTimestamps {
                    index: index + 1,
                    previous,
                    timestamp,
                });
            }
        }
        Ok(Self { samples })
    }

    /// Sort samples by timestamp first, then validate. Duplicates are still
    /// rejected.
    pub fn from_unsorted(mut samples: Vec<Sample>) -> CoreResult<Self> {
        samples.sort_by_key(|s| s.timestamp);
        Self::new(samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Calendar days touched by the series, counting both ends.
    pub fn span_days(&self) -> i64 {
        match (self.first_timestamp(), self.last_timestamp()) {
            (Some(first), Some(last)) => (last.date() - first.date()).num_days() + 1,
            _ => 0,
        }
    }

    /// Distinct calendar years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.samples
            .iter()
            .map(|s| s.timestamp.year())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// ── Enriched rows ─────────────────────────────────────────────────

/// A series row plus derived calendar, window, lag, and rolling fields.
///
/// `Option` fields are `None` while there is not enough history to define
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRow {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub hour: u32,
    /// Monday = 0 … Sunday = 6.
    pub day_of_week: u32,
    pub day_of_month: u32,
    pub is_weekend: bool,
    pub is_event_period: bool,
    /// 0 outside the period, else 1..=N.
    pub event_day: u32,
    pub is_last_phase: bool,
    /// Membership per surge window, indexed by [`SurgeWindow::index`].
    pub in_window: [bool; 3],
    pub lag_1h: Option<f64>,
    pub lag_24h: Option<f64>,
    pub lag_7d: Option<f64>,
    pub rolling_mean_1h: Option<f64>,
    pub rolling_std_1h: Option<f64>,
    pub rolling_max_1h: Option<f64>,
    pub rolling_min_1h: Option<f64>,
    pub rolling_mean_24h: Option<f64>,
}

impl EnrichedRow {
    pub fn in_surge_window(&self, window: SurgeWindow) -> bool {
        self.in_window[window.index()]
    }

    pub fn has_all_lags(&self) -> bool {
        self.lag_1h.is_some() && self.lag_24h.is_some() && self.lag_7d.is_some()
    }

    pub fn in_hours(&self, (start, end): (u32, u32)) -> bool {
        start <= self.hour && self.hour <= end
    }
}

/// Column names of an enriched series, in row-field order.
pub const ENRICHED_COLUMNS: [&str; 19] = [
    "value",
    "hour",
    "day_of_week",
    "day_of_month",
    "is_weekend",
    "is_event_period",
    "event_day",
    "is_last_phase",
    "is_dawn_meal",
    "is_breaking_fast",
    "is_night_prayer",
    "lag_1h",
    "lag_24h",
    "lag_7d",
    "rolling_mean_1h",
    "rolling_std_1h",
    "rolling_max_1h",
    "rolling_min_1h",
    "rolling_mean_24h",
];

/// Output of feature derivation: rows plus the calendar year they were
/// resolved against and the sampling interval they were derived at.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrichedSeries {
    rows: Vec<EnrichedRow>,
    year: i32,
    #[serde(default)]
    interval_minutes: u32,
}

impl EnrichedSeries {
    pub fn new(rows: Vec<EnrichedRow>, year: i32, interval_minutes: u32) -> Self {
        Self {
            rows,
            year,
            interval_minutes,
        }
    }

    pub fn rows(&self) -> &[EnrichedRow] {
        &self.rows
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Minutes between consecutive rows; never zero.
    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes.max(1)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows inside the event period.
    pub fn in_period(&self) -> impl Iterator<Item = &EnrichedRow> {
        self.rows.iter().filter(|r| r.is_event_period && r.event_day > 0)
    }
}

// ── Tabular view ──────────────────────────────────────────────────

/// Column-oriented view used for data-quality scoring.
pub trait Tabular {
    fn row_count(&self) -> usize;

    fn column_names(&self) -> Vec<&'static str>;

    /// Number of missing cells in `column`, or `None` if the column does
    /// not exist.
    fn missing_in(&self, column: &str) -> Option<usize>;
}

impl Tabular for TimeSeries {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn column_names(&self) -> Vec<&'static str> {
        vec!["value"]
    }

    fn missing_in(&self, column: &str) -> Option<usize> {
        (column == "value").then(|| self.samples.iter().filter(|s| s.value.is_nan()).count())
    }
}

impl Tabular for EnrichedSeries {
    fn row_count(&self) -> usize {
        self.len()
    }

    fn column_names(&self) -> Vec<&'static str> {
        ENRICHED_COLUMNS.to_vec()
    }

    fn missing_in(&self, column: &str) -> Option<usize> {
        let is_missing: fn(&EnrichedRow) -> bool = match column {
            "value" => |r| r.value.is_nan(),
            "lag_1h" => |r| r.lag_1h.is_none(),
            "lag_24h" => |r| r.lag_24h.is_none(),
            "lag_7d" => |r| r.lag_7d.is_none(),
            "rolling_mean_1h" => |r| r.rolling_mean_1h.is_none(),
            "rolling_std_1h" => |r| r.rolling_std_1h.is_none(),
            "rolling_max_1h" => |r| r.rolling_max_1h.is_none(),
            "rolling_min_1h" => |r| r.rolling_min_1h.is_none(),
            "rolling_mean_24h" => |r| r.rolling_mean_24h.is_none(),
            other if ENRICHED_COLUMNS.contains(&other) => |_| false,
            _ => return None,
        };
        Some(self.rows.iter().filter(|r| is_missing(r)).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn new_rejects_duplicates() {
        let err = TimeSeries::new(vec![Sample::new(ts(1, 0), 1.0), Sample::new(ts(1, 0), 2.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateTimestamp(_)));
    }

    #[test]
    fn new_rejects_out_of_order() {
        let err = TimeSeries::new(vec![Sample::new(ts(2, 0), 1.0), Sample::new(ts(1, 0), 2.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::UnorderedTimestamps { index: 1, .. }));
    }

    #[test]
    fn from_unsorted_orders_samples() {
        let series =
            TimeSeries::from_unsorted(vec![Sample::new(ts(3, 0), 3.0), Sample::new(ts(1, 0), 1.0)])
                .unwrap();
        assert_eq!(series.values(), vec![1.0, 3.0]);
        assert_eq!(series.span_days(), 3);
        assert_eq!(series.years(), vec![2026]);
    }

    #[test]
    fn time_series_reports_missing_values() {
        let series = TimeSeries::new(vec![
            Sample::new(ts(1, 0), 1.0),
            Sample::new(ts(1, 1), f64::NAN),
        ])
        .unwrap();
        assert_eq!(series.missing_in("value"), Some(1));
        assert_eq!(series.missing_in("lag_1h"), None);
    }
}
