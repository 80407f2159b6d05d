//! crescent.toml configuration parser.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::calendar::{EventCalendar, EventPeriod};
use crate::error::CoreResult;
use crate::features::FeatureOptions;

/// Default minimum history recommended for training.
pub const DEFAULT_MIN_TRAINING_DAYS: u32 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrescentConfig {
    pub calendar: Option<CalendarConfig>,
    pub features: Option<FeaturesConfig>,
    pub training: Option<TrainingConfig>,
    pub scaling: Option<ScalingSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarConfig {
    pub default_year: Option<i32>,
    pub periods: Option<Vec<PeriodConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub year: i32,
    /// Quoted ISO date, e.g. `"2027-02-08"`.
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeaturesConfig {
    pub sample_interval_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub min_training_days: Option<u32>,
}

/// Raw `[scaling]` table. Validated by the scaling calculator, not here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingSection {
    pub capacity_per_unit: Option<f64>,
    pub safety_factor: Option<f64>,
    pub cost_per_unit_hour: Option<f64>,
    pub max_units: Option<u32>,
    pub cost_cap_per_hour: Option<f64>,
}

impl CrescentConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CrescentConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A starter config with every section spelled out at its default.
    pub fn scaffold() -> Self {
        CrescentConfig {
            calendar: Some(CalendarConfig {
                default_year: Some(crate::calendar::DEFAULT_YEAR),
                periods: None,
            }),
            features: Some(FeaturesConfig {
                sample_interval_minutes: Some(1),
            }),
            training: Some(TrainingConfig {
                min_training_days: Some(DEFAULT_MIN_TRAINING_DAYS),
            }),
            scaling: Some(ScalingSection {
                capacity_per_unit: Some(100.0),
                safety_factor: Some(1.2),
                cost_per_unit_hour: Some(0.10),
                max_units: Some(50),
                cost_cap_per_hour: None,
            }),
        }
    }

    /// Built-in calendar with configured periods layered on top.
    pub fn calendar(&self) -> CoreResult<EventCalendar> {
        let mut calendar = EventCalendar::standard();
        let Some(section) = &self.calendar else {
            return Ok(calendar);
        };

        for p in section.periods.iter().flatten() {
            calendar = calendar.with_period(p.year, EventPeriod::new(p.start, p.end)?);
        }

        match section.default_year {
            Some(year) => EventCalendar::new(
                calendar
                    .years()
                    .map(|y| (y, *calendar.period_for(y)))
                    .collect(),
                year,
            ),
            None => Ok(calendar),
        }
    }

    pub fn feature_options(&self) -> FeatureOptions {
        let interval = self
            .features
            .as_ref()
            .and_then(|f| f.sample_interval_minutes)
            .unwrap_or(1);
        FeatureOptions::default().with_interval(interval)
    }

    pub fn min_training_days(&self) -> u32 {
        self.training
            .as_ref()
            .and_then(|t| t.min_training_days)
            .unwrap_or(DEFAULT_MIN_TRAINING_DAYS)
    }

    pub fn scaling_section(&self) -> ScalingSection {
        self.scaling.clone().unwrap_or_default()
    }
}
