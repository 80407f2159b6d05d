//! Event calendar — which days belong to the observance period.
//!
//! The calendar holds a small table of `year → (start, end)` dates. A year
//! missing from the table resolves to the default year's period (see
//! [`EventCalendar::period_for`]).
//!
//! Boundary tests are date-only: the whole of the start and end day is
//! in-period regardless of time of day.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default year used when a requested year has no entry in the table.
pub const DEFAULT_YEAR: i32 = 2026;

/// Inclusive date range of one event period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EventPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidConfig(format!(
                "event period ends ({end}) before it starts ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Number of days in the period, counting both ends.
    pub fn len_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 1-based day number of `date`, or `None` outside the period.
    pub fn day_index(&self, date: NaiveDate) -> Option<u32> {
        if !self.contains(date) {
            return None;
        }
        Some(((date - self.start).num_days() + 1) as u32)
    }

    /// True when `day` falls in the final third of the period.
    pub fn is_last_phase(&self, day: u32) -> bool {
        day > 0 && day * 3 > self.len_days() * 2
    }
}

/// Year-keyed table of event periods with a default-year fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCalendar {
    periods: BTreeMap<i32, EventPeriod>,
    default_year: i32,
}

impl EventCalendar {
    /// Build a calendar from an explicit table. The default year must be
    /// present in the table.
    pub fn new(periods: BTreeMap<i32, EventPeriod>, default_year: i32) -> CoreResult<Self> {
        if !periods.contains_key(&default_year) {
            return Err(CoreError::InvalidConfig(format!(
                "default year {default_year} has no event period"
            )));
        }
        Ok(Self {
            periods,
            default_year,
        })
    }

    /// The built-in table covering 2024–2026, defaulting to 2026.
    pub fn standard() -> Self {
        let mut periods = BTreeMap::new();
        periods.insert(2024, builtin(2024, 3, 11, 2024, 4, 9));
        periods.insert(2025, builtin(2025, 2, 28, 2025, 3, 29));
        periods.insert(2026, builtin(2026, 2, 17, 2026, 3, 18));
        Self {
            periods,
            default_year: DEFAULT_YEAR,
        }
    }

    /// Add or replace the period for `year`.
    pub fn with_period(mut self, year: i32, period: EventPeriod) -> Self {
        self.periods.insert(year, period);
        self
    }

    pub fn default_year(&self) -> i32 {
        self.default_year
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.periods.keys().copied()
    }

    /// Period for `year`. Unknown years resolve to the default year's period.
    pub fn period_for(&self, year: i32) -> &EventPeriod {
        self.periods
            .get(&year)
            .or_else(|| self.periods.get(&self.default_year))
            .unwrap_or(&FALLBACK_PERIOD)
    }

    pub fn is_in_period(&self, timestamp: NaiveDateTime, year: i32) -> bool {
        self.period_for(year).contains(timestamp.date())
    }

    pub fn day_index(&self, timestamp: NaiveDateTime, year: i32) -> Option<u32> {
        self.period_for(year).day_index(timestamp.date())
    }

    /// Day index resolved against the timestamp's own calendar year.
    pub fn day_index_of(&self, timestamp: NaiveDateTime) -> Option<u32> {
        self.day_index(timestamp, timestamp.year())
    }
}

impl Default for EventCalendar {
    fn default() -> Self {
        Self::standard()
    }
}

// Only reachable if a deserialized calendar lost its default-year entry.
const FALLBACK_PERIOD: EventPeriod = EventPeriod {
    start: NaiveDate::MIN,
    end: NaiveDate::MIN,
};

fn builtin(sy: i32, sm: u32, sd: u32, ey: i32, em: u32, ed: u32) -> EventPeriod {
    match (
        NaiveDate::from_ymd_opt(sy, sm, sd),
        NaiveDate::from_ymd_opt(ey, em, ed),
    ) {
        (Some(start), Some(end)) => EventPeriod { start, end },
        _ => FALLBACK_PERIOD,
    }
}

// ── Surge windows ─────────────────────────────────────────────────

/// A named hour-of-day range historically associated with a traffic spike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SurgeWindow {
    /// Pre-dawn meal.
    DawnMeal,
    /// Post-fast evening meal.
    BreakingFast,
    /// Night prayer after the evening meal.
    NightPrayer,
}

impl SurgeWindow {
    pub const ALL: [SurgeWindow; 3] = [
        SurgeWindow::DawnMeal,
        SurgeWindow::BreakingFast,
        SurgeWindow::NightPrayer,
    ];

    /// Inclusive `(start_hour, end_hour)` of the window.
    pub const fn hours(self) -> (u32, u32) {
        match self {
            SurgeWindow::DawnMeal => (3, 5),
            SurgeWindow::BreakingFast => (18, 20),
            SurgeWindow::NightPrayer => (20, 22),
        }
    }

    pub const fn contains_hour(self, hour: u32) -> bool {
        let (start, end) = self.hours();
        start <= hour && hour <= end
    }

    pub const fn name(self) -> &'static str {
        match self {
            SurgeWindow::DawnMeal => "dawn-meal",
            SurgeWindow::BreakingFast => "breaking-fast",
            SurgeWindow::NightPrayer => "night-prayer",
        }
    }

    /// Position of this window in [`SurgeWindow::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SurgeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SurgeWindow {
    type Err = CoreError;

    /// Case- and whitespace-insensitive; `_` and spaces count as `-`, and
    /// the traditional names are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "dawn-meal" | "suhoor" => Ok(SurgeWindow::DawnMeal),
            "breaking-fast" | "iftar" => Ok(SurgeWindow::BreakingFast),
            "night-prayer" | "taraweeh" => Ok(SurgeWindow::NightPrayer),
            _ => Err(CoreError::InvalidConfig(format!("unknown surge window: {s}"))),
        }
    }
}
