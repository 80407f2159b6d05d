//! `crescent events` — review the scaling-event log and record decisions.
//!
//! `forecast` logs every recommendation as a `pending` event. An operator
//! then approves it (stamping the execution time) or rejects it.

use chrono::{NaiveDateTime, Utc};
use crescent_state::{EventStatus, ScalingEvent, Verdict, validate_tenant_id};
use serde::Serialize;

use super::Context;
use crate::OutputFormat;

/// Default listing size.
pub const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EventsOutcome {
    Listed {
        tenant_id: String,
        events: Vec<ScalingEvent>,
    },
    Decided {
        key: String,
        event: ScalingEvent,
    },
}

/// Newest events for `tenant` first, optionally only those in `status`.
pub fn list(
    ctx: &Context,
    tenant: &str,
    limit: usize,
    status: Option<EventStatus>,
) -> anyhow::Result<EventsOutcome> {
    let tenant_id = validate_tenant_id(tenant)?;
    let store = ctx.open_store()?;
    let events = match status {
        None => store.list_events(&tenant_id, limit)?,
        Some(status) => store
            .list_events(&tenant_id, usize::MAX)?
            .into_iter()
            .filter(|e| e.status == status)
            .take(limit)
            .collect(),
    };
    Ok(EventsOutcome::Listed { tenant_id, events })
}

/// Approve or reject the pending event stored under `key`.
pub fn decide(
    ctx: &Context,
    key: &str,
    verdict: Verdict,
    by: &str,
    at: Option<NaiveDateTime>,
) -> anyhow::Result<EventsOutcome> {
    let store = ctx.open_store()?;
    let at = at.unwrap_or_else(|| Utc::now().naive_utc());
    let event = store.decide_event(key, verdict, by, at)?;
    Ok(EventsOutcome::Decided {
        key: key.to_string(),
        event,
    })
}

pub fn print(outcome: &EventsOutcome, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(outcome)?),
        OutputFormat::Text => println!("{}", render(outcome)),
    }
    Ok(())
}

fn render(outcome: &EventsOutcome) -> String {
    match outcome {
        EventsOutcome::Decided { key, event } => {
            let by = event.approved_by.as_deref().unwrap_or("-");
            match event.executed_at {
                Some(at) => format!("Event {key} {} by {by}, executed at {at}.", event.status),
                None => format!("Event {key} {} by {by}.", event.status),
            }
        }
        EventsOutcome::Listed { tenant_id, events } if events.is_empty() => {
            format!("No scaling events for tenant '{tenant_id}'.")
        }
        EventsOutcome::Listed { events, .. } => {
            let mut lines = vec![format!(
                "{:<20} {:<14} {:>9} {:>10} {:>5}  {:<9} {}",
                "RECORDED AT", "EVENT", "REPLICAS", "COST/H", "CONF", "STATUS", "KEY"
            )];
            for e in events {
                lines.push(format!(
                    "{:<20} {:<14} {:>9} {:>10} {:>5.2}  {:<9} {}",
                    e.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    e.event_type,
                    format!("{}->{}", e.current_units, e.recommended_units),
                    format!("{:+.2}", e.cost_impact_per_hour),
                    e.confidence,
                    e.status.as_str(),
                    e.table_key(),
                ));
            }
            lines.join("\n")
        }
    }
}
