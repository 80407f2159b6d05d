//! `crescent train` — load, resample, validate, derive, train, store.

use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use crescent_core::series::ENRICHED_COLUMNS;
use crescent_core::{CoreError, FeatureDeriver, FeatureOptions, loader};
use crescent_forecast::{HybridForecaster, ModelSummary};
use crescent_state::{StoredModel, TrainingStats, validate_tenant_id};
use serde::Serialize;
use tracing::{info, warn};

use super::Context;
use crate::OutputFormat;

pub struct TrainArgs<'a> {
    pub tenant: &'a str,
    pub input: &'a Path,
    pub min_training_days: Option<u32>,
    pub year: Option<i32>,
    /// Version timestamp; now when `None`.
    pub trained_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct TrainingReport {
    pub key: String,
    pub tenant_id: String,
    pub trained_at: NaiveDateTime,
    pub min_training_days: u32,
    pub stats: TrainingStats,
    pub model: ModelSummary,
}

pub fn run(ctx: &Context, args: &TrainArgs<'_>) -> anyhow::Result<TrainingReport> {
    let tenant_id = validate_tenant_id(args.tenant)?;
    let min_training_days = args
        .min_training_days
        .unwrap_or_else(|| ctx.config.min_training_days());
    if min_training_days < 1 {
        anyhow::bail!("min_training_days must be >= 1, got {min_training_days}");
    }

    let raw = loader::read_json(args.input)?;
    if raw.is_empty() {
        anyhow::bail!(
            "no historical data for tenant '{tenant_id}' in {}",
            args.input.display()
        );
    }

    let configured = ctx.config.feature_options();
    let series = loader::resample(&raw, configured.sample_interval_minutes)?;
    loader::validate_quality(&series)?;

    // An explicit year pins the event period, so older years are context.
    let years = series.years();
    if args.year.is_none() && years.len() > 1 {
        return Err(CoreError::MultiYearSeries(years).into());
    }

    let days_of_data = series.span_days();
    if days_of_data < i64::from(min_training_days) {
        warn!(
            tenant = %tenant_id,
            days_of_data,
            min_training_days,
            "less history than recommended, model quality may be reduced"
        );
    }

    let calendar = ctx.config.calendar()?;
    let options = FeatureOptions {
        year: args.year,
        ..configured
    }
    .keep_all_rows();
    let enriched = FeatureDeriver::new(calendar.clone()).derive(&series, &options)?;

    let mut forecaster = HybridForecaster::new(calendar);
    forecaster.train(&enriched)?;

    let (Some(range_start), Some(range_end)) = (series.first_timestamp(), series.last_timestamp())
    else {
        anyhow::bail!("resampled series is empty");
    };
    let stats = TrainingStats {
        total_points: series.len(),
        range_start,
        range_end,
        days_of_data,
        feature_count: ENRICHED_COLUMNS.len() - 1,
        in_period_rows: enriched.in_period().count(),
    };

    let model = StoredModel {
        tenant_id: tenant_id.clone(),
        trained_at: args.trained_at.unwrap_or_else(|| Utc::now().naive_utc()),
        stats,
        forecaster,
    };
    let key = ctx.open_store()?.put_model(&model)?;
    info!(%key, points = model.stats.total_points, "model saved");

    Ok(TrainingReport {
        key,
        tenant_id,
        trained_at: model.trained_at,
        min_training_days,
        model: model.forecaster.model_summary(),
        stats: model.stats,
    })
}

pub fn print(report: &TrainingReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => println!("{}", render(report)),
    }
    Ok(())
}

fn render(report: &TrainingReport) -> String {
    let s = &report.stats;
    let mut lines = vec![
        "Training summary".to_string(),
        format!("  Tenant:        {}", report.tenant_id),
        format!("  Trained at:    {}", report.trained_at),
        format!("  Model key:     {}", report.key),
        format!("  Data points:   {}", s.total_points),
        format!("  Date range:    {} to {}", s.range_start, s.range_end),
        format!(
            "  Days of data:  {} (recommended minimum {})",
            s.days_of_data, report.min_training_days
        ),
        format!("  In-period rows: {}", s.in_period_rows),
        format!("  Features:      {}", s.feature_count),
    ];
    if let ModelSummary::Trained {
        forecast_horizon_hours,
        trigger_rules,
        patterns,
        ..
    } = &report.model
    {
        lines.push(format!("  Horizon:       {forecast_horizon_hours} hours"));
        lines.push(format!("  Trigger rules: {} events", trigger_rules.len()));
        lines.push(format!("  Event days:    {}", patterns.total_days_analyzed));
    }
    lines.join("\n")
}
