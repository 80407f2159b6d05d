//! Series loading helpers: JSON input, fixed-interval resampling, and a
//! data-quality gate.
//!
//! These run before the forecasting pipeline; the pipeline itself assumes
//! its input has already been resampled and forward-filled.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::series::{Sample, TimeSeries};

/// Missing-value percentage above which a series is rejected.
pub const MAX_MISSING_PCT: f64 = 20.0;

/// On-disk record shape: `{"timestamp": "2026-02-17T18:00:00", "value": 412.0}`.
/// A `null` value marks a gap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

/// Parse a JSON array of records into a series, sorting by timestamp.
pub fn parse_json(input: &str) -> CoreResult<TimeSeries> {
    let records: Vec<SeriesRecord> =
        serde_json::from_str(input).map_err(|e| CoreError::Parse(e.to_string()))?;
    let samples = records
        .into_iter()
        .map(|r| Sample::new(r.timestamp, r.value.unwrap_or(f64::NAN)))
        .collect();
    TimeSeries::from_unsorted(samples)
}

pub fn read_json(path: &Path) -> CoreResult<TimeSeries> {
    let content = std::fs::read_to_string(path)?;
    let series = parse_json(&content)?;
    debug!(?path, rows = series.len(), "series loaded");
    Ok(series)
}

/// Serialize a series back into the record format.
pub fn to_json(series: &TimeSeries) -> CoreResult<String> {
    let records: Vec<SeriesRecord> = series
        .samples()
        .iter()
        .map(|s| SeriesRecord {
            timestamp: s.timestamp,
            value: (!s.value.is_nan()).then_some(s.value),
        })
        .collect();
    serde_json::to_string_pretty(&records).map_err(|e| CoreError::Parse(e.to_string()))
}

/// Resample onto a fixed `interval_minutes` grid.
///
/// Each bucket holds the mean of the present values falling in it. Every
/// bucket between the first and last is emitted; empty buckets are
/// forward-filled from the previous bucket.
pub fn resample(series: &TimeSeries, interval_minutes: u32) -> CoreResult<TimeSeries> {
    if interval_minutes == 0 {
        return Err(CoreError::InvalidSampleInterval(0));
    }
    let step = i64::from(interval_minutes);

    let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for s in series.samples() {
        let minute = s.timestamp.and_utc().timestamp().div_euclid(60);
        let entry = buckets.entry(minute.div_euclid(step) * step).or_insert((0.0, 0));
        if !s.value.is_nan() {
            entry.0 += s.value;
            entry.1 += 1;
        }
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(TimeSeries::default());
    };

    let mut samples = Vec::with_capacity(((last - first) / step + 1) as usize);
    let mut carry = f64::NAN;
    let mut bucket = first;
    while bucket <= last {
        let value = match buckets.get(&bucket) {
            Some(&(sum, n)) if n > 0 => sum / n as f64,
            _ => carry,
        };
        carry = value;
        samples.push(Sample::new(minute_to_timestamp(bucket)?, value));
        bucket += step;
    }

    debug!(
        input = series.len(),
        output = samples.len(),
        interval_minutes,
        "series resampled"
    );
    TimeSeries::new(samples)
}

/// Reject empty series and series with more than [`MAX_MISSING_PCT`]
/// percent missing values.
pub fn validate_quality(series: &TimeSeries) -> CoreResult<()> {
    if series.is_empty() {
        return Err(CoreError::EmptySeries);
    }
    let missing = series.samples().iter().filter(|s| s.value.is_nan()).count();
    let missing_pct = missing as f64 / series.len() as f64 * 100.0;
    if missing_pct > MAX_MISSING_PCT {
        return Err(CoreError::InsufficientQuality { missing_pct });
    }
    Ok(())
}

fn minute_to_timestamp(minute: i64) -> CoreResult<NaiveDateTime> {
    DateTime::from_timestamp(minute * 60, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| CoreError::Parse(format!("timestamp out of range: minute {minute}")))
}
