//! Scaling events: recommendations waiting on, or carrying, a human decision.
//!
//! ```text
//! pending ──approve──► approved   (approved_by, executed_at set)
//!    └─────reject────► rejected   (approved_by set)
//! ```

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::model_key;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision on a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

/// One recorded scaling recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingEvent {
    pub tenant_id: String,
    pub recorded_at: NaiveDateTime,
    /// Surge window the recommendation was made for.
    pub event_type: String,
    pub current_units: u32,
    pub recommended_units: u32,
    pub cost_impact_per_hour: f64,
    pub confidence: f64,
    pub reason: String,
    pub status: EventStatus,
    pub approved_by: Option<String>,
    pub executed_at: Option<NaiveDateTime>,
}

impl ScalingEvent {
    /// A fresh `pending` event.
    pub fn pending(
        tenant_id: impl Into<String>,
        recorded_at: NaiveDateTime,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            recorded_at,
            event_type: event_type.into(),
            current_units: 0,
            recommended_units: 0,
            cost_impact_per_hour: 0.0,
            confidence: 0.0,
            reason: String::new(),
            status: EventStatus::Pending,
            approved_by: None,
            executed_at: None,
        }
    }

    pub fn table_key(&self) -> String {
        format!(
            "{}:{}",
            model_key(&self.tenant_id, self.recorded_at),
            self.event_type
        )
    }

    /// Apply `verdict`; callers check the event is still pending.
    pub(crate) fn decide(&mut self, verdict: Verdict, by: &str, at: NaiveDateTime) {
        self.approved_by = Some(by.to_string());
        match verdict {
            Verdict::Approve => {
                self.status = EventStatus::Approved;
                self.executed_at = Some(at);
            }
            Verdict::Reject => self.status = EventStatus::Rejected,
        }
    }
}
