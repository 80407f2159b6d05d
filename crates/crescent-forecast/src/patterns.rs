//! Learned surge and progression patterns.
//!
//! Both maps are value objects: every `learn*` call builds them from
//! scratch out of the series it is given, so two tenants can never share
//! state through a learner instance.
//!
//! # Surge multipliers
//!
//! ```text
//! baseline   = median(in-period values, hours 10..=14)
//!              (→ median(all in-period values) if empty or zero)
//! multiplier = max(window values that day) / baseline      per event day
//! duration   = last - first sample above 1.5 × baseline, + one interval
//! confidence = clamp(1 - 0.5 × std/mean, 0.6, 0.99)        (0.6 if < 3 days)
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use crescent_core::series::{EnrichedRow, EnrichedSeries};
use crescent_core::{SurgeWindow, stats};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Midday hours used as the non-surge reference level.
pub const BASELINE_HOURS: (u32, u32) = (10, 14);

/// A sample counts toward surge duration above `baseline × SURGE_THRESHOLD`.
pub const SURGE_THRESHOLD: f64 = 1.5;

/// Confidence used when fewer than three multipliers were observed.
pub const WEAK_PRIOR_CONFIDENCE: f64 = 0.6;
pub const MAX_PATTERN_CONFIDENCE: f64 = 0.99;

const MIN_MULTIPLIER_SAMPLES: usize = 3;
const DEFAULT_DURATION_MINUTES: f64 = 60.0;

/// Progression factors used when a tertile has no learned days.
pub const DEFAULT_EARLY_FACTOR: f64 = 1.0;
pub const DEFAULT_MID_FACTOR: f64 = 1.1;
pub const DEFAULT_LATE_FACTOR: f64 = 1.25;

/// Last day of the early and mid tertiles.
const EARLY_LAST_DAY: i64 = 10;
const MID_LAST_DAY: i64 = 20;

/// Statistics of one surge window across the observed event days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurgePattern {
    pub multiplier_mean: f64,
    pub multiplier_std: f64,
    pub duration_minutes_mean: f64,
    pub duration_minutes_std: f64,
    /// In `[0.6, 0.99]`.
    pub confidence: f64,
    /// Number of multiplier observations behind `multiplier_mean`.
    pub sample_size: usize,
}

/// Traffic profile of a single event day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPattern {
    pub avg_traffic: f64,
    pub peak_traffic: f64,
    pub peak_hour: u32,
    /// That day's own midday median.
    pub baseline_traffic: f64,
}

/// Progression factors at representative days of each tertile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSummary {
    pub early: f64,
    pub mid: f64,
    pub late: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSummary {
    pub surge_patterns: BTreeMap<SurgeWindow, SurgePattern>,
    pub daily_progression: ProgressionSummary,
    pub total_days_analyzed: usize,
}

/// Surge and per-day patterns learned from one enriched series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnedPatterns {
    pub surge_patterns: BTreeMap<SurgeWindow, SurgePattern>,
    pub daily_patterns: BTreeMap<u32, DayPattern>,
}

impl LearnedPatterns {
    /// Learn both surge patterns and daily progression from `series`.
    pub fn learn(series: &EnrichedSeries) -> Self {
        Self {
            surge_patterns: learn_surge_patterns(series),
            daily_patterns: learn_daily_progression(series),
        }
    }

    pub fn surge_pattern(&self, window: SurgeWindow) -> Option<&SurgePattern> {
        self.surge_patterns.get(&window)
    }

    /// Traffic adjustment for `day` relative to the early tertile.
    ///
    /// Unlearned days get the tertile default. A tertile without learned
    /// days projects the early average by its default factor. Zero or
    /// non-finite baselines yield the early default.
    pub fn day_adjustment_factor(&self, day: i64) -> f64 {
        let tertile = Tertile::of(day);
        let Some(day) = u32::try_from(day)
            .ok()
            .filter(|d| self.daily_patterns.contains_key(d))
        else {
            return tertile.default_factor();
        };

        let early_avg = self.average_where(|d| i64::from(d) <= EARLY_LAST_DAY);
        let (current_avg, baseline_avg) = match tertile {
            Tertile::Early => (
                self.average_where(|d| i64::from(d) <= EARLY_LAST_DAY && d <= day),
                early_avg,
            ),
            Tertile::Mid | Tertile::Late => {
                let own_avg = self.average_where(|d| tertile.contains(i64::from(d)) && d <= day);
                if self.has_days_in(tertile) {
                    (own_avg, early_avg.or(own_avg))
                } else {
                    match early_avg {
                        Some(early) => (Some(early * tertile.default_factor()), Some(early)),
                        None => return tertile.default_factor(),
                    }
                }
            }
        };

        match (current_avg, baseline_avg) {
            (Some(current), Some(baseline)) if baseline != 0.0 && baseline.is_finite() => {
                let factor = current / baseline;
                if factor.is_finite() {
                    factor
                } else {
                    tertile.default_factor()
                }
            }
            _ => DEFAULT_EARLY_FACTOR,
        }
    }

    pub fn summary(&self) -> PatternSummary {
        PatternSummary {
            surge_patterns: self.surge_patterns.clone(),
            daily_progression: ProgressionSummary {
                early: self.day_adjustment_factor(5),
                mid: self.day_adjustment_factor(15),
                late: self.day_adjustment_factor(25),
            },
            total_days_analyzed: self.daily_patterns.len(),
        }
    }

    fn average_where(&self, keep: impl Fn(u32) -> bool) -> Option<f64> {
        let avgs: Vec<f64> = self
            .daily_patterns
            .iter()
            .filter(|(d, _)| keep(**d))
            .map(|(_, p)| p.avg_traffic)
            .collect();
        stats::mean(&avgs)
    }

    fn has_days_in(&self, tertile: Tertile) -> bool {
        self.daily_patterns
            .keys()
            .any(|d| tertile.contains(i64::from(*d)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tertile {
    Early,
    Mid,
    Late,
}

impl Tertile {
    fn of(day: i64) -> Self {
        if day <= EARLY_LAST_DAY {
            Tertile::Early
        } else if day <= MID_LAST_DAY {
            Tertile::Mid
        } else {
            Tertile::Late
        }
    }

    fn contains(self, day: i64) -> bool {
        day >= 1 && Tertile::of(day) == self
    }

    fn default_factor(self) -> f64 {
        match self {
            Tertile::Early => DEFAULT_EARLY_FACTOR,
            Tertile::Mid => DEFAULT_MID_FACTOR,
            Tertile::Late => DEFAULT_LATE_FACTOR,
        }
    }
}

// ── Learning ──────────────────────────────────────────────────────

/// Learn one [`SurgePattern`] per surge window that has in-period rows.
pub fn learn_surge_patterns(series: &EnrichedSeries) -> BTreeMap<SurgeWindow, SurgePattern> {
    let in_period: Vec<&EnrichedRow> = series.in_period().collect();
    let baseline = surge_baseline(&in_period);
    let interval = f64::from(series.interval_minutes());
    let mut patterns = BTreeMap::new();

    for window in SurgeWindow::ALL {
        let by_day = group_by_day(in_period.iter().copied().filter(|r| r.in_surge_window(window)));
        if by_day.is_empty() {
            continue;
        }

        let mut multipliers = Vec::new();
        let mut durations = Vec::new();

        for rows in by_day.values() {
            let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
            let Some(b) = baseline else { continue };

            if b > 0.0
                && let Some(peak) = stats::max(&values)
            {
                multipliers.push(peak / b);
            }
            if let Some(duration) = surge_duration(rows, b * SURGE_THRESHOLD, interval) {
                durations.push(duration);
            }
        }

        let pattern = SurgePattern {
            multiplier_mean: stats::mean(&multipliers).unwrap_or(1.0),
            multiplier_std: stats::std_dev(&multipliers, 0).unwrap_or(0.0),
            duration_minutes_mean: stats::mean(&durations).unwrap_or(DEFAULT_DURATION_MINUTES),
            duration_minutes_std: stats::std_dev(&durations, 0).unwrap_or(0.0),
            confidence: multiplier_confidence(&multipliers),
            sample_size: multipliers.len(),
        };
        debug!(
            %window,
            days = by_day.len(),
            multiplier = pattern.multiplier_mean,
            confidence = pattern.confidence,
            "surge pattern learned"
        );
        patterns.insert(window, pattern);
    }

    patterns
}

/// Learn one [`DayPattern`] per event day that has present values.
pub fn learn_daily_progression(series: &EnrichedSeries) -> BTreeMap<u32, DayPattern> {
    let by_day = group_by_day(series.in_period());
    let mut patterns = BTreeMap::new();

    for (day, rows) in by_day {
        let values: Vec<f64> = rows.iter().map(|r| r.value).collect();
        let (Some(avg), Some(peak_row)) = (stats::mean(&values), peak_row(&rows)) else {
            continue;
        };

        let midday: Vec<f64> = rows
            .iter()
            .filter(|r| r.in_hours(BASELINE_HOURS))
            .map(|r| r.value)
            .collect();
        let baseline = stats::median(&midday)
            .or_else(|| stats::median(&values))
            .unwrap_or(0.0);

        patterns.insert(
            day,
            DayPattern {
                avg_traffic: avg,
                peak_traffic: peak_row.value,
                peak_hour: peak_row.hour,
                baseline_traffic: baseline,
            },
        );
    }

    debug!(days = patterns.len(), "daily progression learned");
    patterns
}

/// Confidence from the coefficient of variation of `multipliers`.
pub fn multiplier_confidence(multipliers: &[f64]) -> f64 {
    let clean = stats::present(multipliers);
    if clean.len() < MIN_MULTIPLIER_SAMPLES {
        return WEAK_PRIOR_CONFIDENCE;
    }
    match (stats::mean(&clean), stats::std_dev(&clean, 0)) {
        (Some(mean), Some(std)) if mean != 0.0 && mean.is_finite() && std.is_finite() => {
            (1.0 - 0.5 * (std / mean)).clamp(WEAK_PRIOR_CONFIDENCE, MAX_PATTERN_CONFIDENCE)
        }
        _ => WEAK_PRIOR_CONFIDENCE,
    }
}

fn surge_baseline(in_period: &[&EnrichedRow]) -> Option<f64> {
    let midday: Vec<f64> = in_period
        .iter()
        .filter(|r| r.in_hours(BASELINE_HOURS))
        .map(|r| r.value)
        .collect();
    match stats::median(&midday) {
        Some(b) if b != 0.0 => Some(b),
        _ => {
            let all: Vec<f64> = in_period.iter().map(|r| r.value).collect();
            stats::median(&all)
        }
    }
}

/// Minutes between the first and last sample above `threshold`, plus one
/// sampling interval. `None` when no sample qualifies.
fn surge_duration(rows: &[&EnrichedRow], threshold: f64, interval_minutes: f64) -> Option<f64> {
    let above: Vec<NaiveDateTime> = rows
        .iter()
        .filter(|r| r.value > threshold)
        .map(|r| r.timestamp)
        .collect();
    let (first, last) = (above.first()?, above.last()?);
    Some(minutes_between(*first, *last) + interval_minutes)
}

fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

/// First row holding the day's maximum value.
fn peak_row<'a>(rows: &[&'a EnrichedRow]) -> Option<&'a EnrichedRow> {
    let mut best: Option<&'a EnrichedRow> = None;
    for &row in rows.iter().filter(|r| !r.value.is_nan()) {
        if best.is_none_or(|b| row.value > b.value) {
            best = Some(row);
        }
    }
    best
}

fn group_by_day<'a>(
    rows: impl Iterator<Item = &'a EnrichedRow>,
) -> BTreeMap<u32, Vec<&'a EnrichedRow>> {
    let mut by_day: BTreeMap<u32, Vec<&EnrichedRow>> = BTreeMap::new();
    for row in rows.filter(|r| r.event_day > 0) {
        by_day.entry(row.event_day).or_default().push(row);
    }
    by_day
}
