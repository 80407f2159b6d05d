//! `crescent summary` — what the tenant's latest model learned.

use std::fmt::Write as _;

use chrono::NaiveDateTime;
use crescent_forecast::ModelSummary;
use crescent_scale::{ConfigSummary, ScalingCalculator, ScalingConfig};
use crescent_state::{TrainingStats, validate_tenant_id};
use serde::Serialize;

use super::Context;
use crate::OutputFormat;

#[derive(Debug, Serialize)]
pub struct SummaryReport {
    pub tenant_id: String,
    pub model_key: String,
    pub trained_at: NaiveDateTime,
    pub stats: TrainingStats,
    pub model: ModelSummary,
    pub scaling: ConfigSummary,
}

pub fn run(ctx: &Context, tenant: &str) -> anyhow::Result<SummaryReport> {
    let tenant_id = validate_tenant_id(tenant)?;
    let Some(model) = ctx.open_store()?.latest_model(&tenant_id)? else {
        anyhow::bail!("no trained model for tenant '{tenant_id}'");
    };
    let calculator = ScalingCalculator::new(ScalingConfig::from_section(
        &ctx.config.scaling_section(),
    ))?;

    Ok(SummaryReport {
        model_key: model.table_key(),
        model: model.forecaster.model_summary(),
        scaling: calculator.config_summary(),
        tenant_id,
        trained_at: model.trained_at,
        stats: model.stats,
    })
}

pub fn print(report: &SummaryReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => println!("{}", render(report)),
    }
    Ok(())
}

fn render(report: &SummaryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Model {} (trained {})", report.model_key, report.trained_at);
    let _ = writeln!(
        out,
        "  Data: {} points, {} days, {} to {}",
        report.stats.total_points,
        report.stats.days_of_data,
        report.stats.range_start,
        report.stats.range_end
    );

    match &report.model {
        ModelSummary::Untrained => {
            let _ = writeln!(out, "  Forecaster: untrained");
        }
        ModelSummary::Trained {
            baseline,
            patterns,
            forecast_horizon_hours,
            trigger_rules,
        } => {
            if let Some(b) = baseline {
                let _ = writeln!(
                    out,
                    "  Baseline: {} hours, {} samples, avg confidence {:.2}",
                    b.hours_covered, b.total_samples, b.avg_confidence
                );
                for (hour, multiplier) in &b.peak_hours {
                    let _ = writeln!(out, "    peak {hour:02}:00  {multiplier:.2}x");
                }
            }
            let _ = writeln!(out, "  Surge windows:");
            for (window, p) in &patterns.surge_patterns {
                let _ = writeln!(
                    out,
                    "    {:<14} {:.2}x ±{:.2}, {:.0} min, confidence {:.2} (n={})",
                    window.name(),
                    p.multiplier_mean,
                    p.multiplier_std,
                    p.duration_minutes_mean,
                    p.confidence,
                    p.sample_size
                );
            }
            let d = &patterns.daily_progression;
            let _ = writeln!(
                out,
                "  Progression: early {:.2}, mid {:.2}, late {:.2} ({} days analyzed)",
                d.early, d.mid, d.late, patterns.total_days_analyzed
            );
            let _ = writeln!(out, "  Horizon: {forecast_horizon_hours} hours");
            for rule in trigger_rules {
                let _ = writeln!(
                    out,
                    "    {:<14} trigger {:02}:00 -> event {:02}:00",
                    rule.window.name(),
                    rule.trigger_hour,
                    rule.event_hour
                );
            }
        }
    }

    let s = &report.scaling;
    let _ = write!(
        out,
        "  Scaling: {:.0}/replica, safety {:.2}, ${:.2}/replica-hour, replicas {}..={}",
        s.capacity_per_unit, s.safety_factor, s.cost_per_unit_hour, s.min_units, s.max_units
    );
    if let Some(cap) = s.cost_cap_per_hour {
        let _ = write!(out, ", cost cap ${cap:.2}/hour");
    }
    out
}
