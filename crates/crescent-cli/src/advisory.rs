//! Operator-facing urgency for a forecast.
//!
//! ```text
//! event day >= 21           -> CRITICAL / SCALE_UP_PREEMPTIVE
//! day factor > 1.2          -> MEDIUM   / SCALE_UP_ADVISORY
//! otherwise                 -> LOW      / STABLE
//! ```

use std::fmt;

use serde::Serialize;

/// First event day of the final phase.
pub const FINAL_PHASE_DAY: u32 = 21;
/// Day factor above which an advisory scale-up is suggested.
pub const ELEVATED_DAY_FACTOR: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    ScaleUpPreemptive,
    ScaleUpAdvisory,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub priority: Priority,
    pub action: Action,
    pub action_required: bool,
    pub day_factor: f64,
    pub reasoning: String,
}

impl Advisory {
    pub fn classify(event_day: Option<u32>, day_factor: f64) -> Self {
        let (priority, action, reasoning) = match event_day {
            Some(day) if day >= FINAL_PHASE_DAY => (
                Priority::Critical,
                Action::ScaleUpPreemptive,
                format!("final phase (day {day}), significant surge expected"),
            ),
            _ if day_factor > ELEVATED_DAY_FACTOR => (
                Priority::Medium,
                Action::ScaleUpAdvisory,
                format!("learned day factor {day_factor:.2} shows a rising trend"),
            ),
            _ => (
                Priority::Low,
                Action::Stable,
                "traffic within seasonal baseline".to_string(),
            ),
        };
        Self {
            priority,
            action,
            action_required: action != Action::Stable,
            day_factor,
            reasoning,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Critical => "CRITICAL",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::ScaleUpPreemptive => "SCALE_UP_PREEMPTIVE",
            Action::ScaleUpAdvisory => "SCALE_UP_ADVISORY",
            Action::Stable => "STABLE",
        })
    }
}
