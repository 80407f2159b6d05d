//! `crescent forecast` — run the tenant's latest model and size the fleet.

use std::path::Path;

use chrono::{NaiveDateTime, Utc};
use crescent_core::{Tabular, loader};
use crescent_forecast::{ConfidenceLevel, EventForecast};
use crescent_scale::{ScaleDecision, ScalingCalculator, ScalingConfig, ScalingRecommendation};
use crescent_state::{ScalingEvent, validate_tenant_id};
use serde::Serialize;
use tracing::info;

use super::Context;
use crate::OutputFormat;
use crate::advisory::Advisory;

pub struct ForecastArgs<'a> {
    pub tenant: &'a str,
    pub at: NaiveDateTime,
    pub traffic: f64,
    pub current_units: u32,
    pub history: Option<&'a Path>,
    pub min_unit_change: u32,
    /// Time the resulting scaling events are logged under; now if unset.
    pub recorded_at: Option<NaiveDateTime>,
}

/// One forecast with the recommendation derived from it.
#[derive(Debug, Serialize)]
pub struct Advice {
    pub forecast: EventForecast,
    pub confidence_level: ConfidenceLevel,
    pub recommendation: ScalingRecommendation,
    pub decision: ScaleDecision,
    pub should_scale: bool,
    pub advisory: Advisory,
    /// Key of the pending scaling event logged for this recommendation.
    pub event_key: String,
}

#[derive(Debug, Serialize)]
pub struct ForecastReport {
    pub tenant_id: String,
    pub model_key: String,
    pub at: NaiveDateTime,
    pub current_traffic: f64,
    pub advice: Vec<Advice>,
    #[serde(skip)]
    rendered: Vec<String>,
}

pub fn run(ctx: &Context, args: &ForecastArgs<'_>) -> anyhow::Result<ForecastReport> {
    let tenant_id = validate_tenant_id(args.tenant)?;
    let store = ctx.open_store()?;
    let Some(model) = store.latest_model(&tenant_id)? else {
        anyhow::bail!("no trained model for tenant '{tenant_id}'; run `crescent train` first");
    };

    let history = args.history.map(loader::read_json).transpose()?;
    let forecaster = &model.forecaster;
    let forecasts = forecaster.forecast(
        args.at,
        args.traffic,
        history.as_ref().map(|h| h as &dyn Tabular),
    )?;

    let calculator = ScalingCalculator::new(ScalingConfig::from_section(
        &ctx.config.scaling_section(),
    ))?;

    let recorded_at = args.recorded_at.unwrap_or_else(|| Utc::now().naive_utc());
    let mut advice = Vec::with_capacity(forecasts.len());
    let mut rendered = Vec::with_capacity(forecasts.len());
    for forecast in forecasts {
        let recommendation = calculator.calculate_recommendation(
            forecast.predicted_traffic,
            args.current_units,
            &reason(&forecast),
        )?;
        let decision = calculator.decide(&recommendation, args.min_unit_change);
        let day_factor = forecast
            .event_day
            .map_or(1.0, |d| forecaster.patterns().day_adjustment_factor(i64::from(d)));

        info!(
            tenant = %tenant_id,
            event = %forecast.event,
            predicted = forecast.predicted_traffic,
            confidence = forecast.confidence,
            recommended = recommendation.recommended_units,
            ?decision,
            "forecast ready"
        );

        let event_key = store.put_event(&ScalingEvent {
            current_units: recommendation.current_units,
            recommended_units: recommendation.recommended_units,
            cost_impact_per_hour: recommendation.cost_delta_per_hour,
            confidence: forecast.confidence,
            reason: recommendation.reason.clone(),
            ..ScalingEvent::pending(&tenant_id, recorded_at, forecast.event.name())
        })?;

        rendered.push(calculator.format_recommendation(&recommendation));
        advice.push(Advice {
            confidence_level: forecaster.scorer().level(forecast.confidence),
            should_scale: matches!(decision, ScaleDecision::ScaleTo(_)),
            advisory: Advisory::classify(forecast.event_day, day_factor),
            forecast,
            recommendation,
            decision,
            event_key,
        });
    }

    Ok(ForecastReport {
        model_key: model.table_key(),
        tenant_id,
        at: args.at,
        current_traffic: args.traffic,
        advice,
        rendered,
    })
}

fn reason(forecast: &EventForecast) -> String {
    format!(
        "{} in {:.1}h: {:.1}x baseline (confidence {:.2}, {})",
        forecast.event,
        forecast.time_to_impact_hours,
        forecast.multiplier,
        forecast.confidence,
        if forecast.used_learned {
            "learned"
        } else {
            "baseline fallback"
        }
    )
}

pub fn print(report: &ForecastReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => println!("{}", render(report)),
    }
    Ok(())
}

fn render(report: &ForecastReport) -> String {
    if report.advice.is_empty() {
        return format!(
            "No surge forecast for tenant '{}' at {} (outside the event period or not a trigger hour).",
            report.tenant_id, report.at
        );
    }

    let mut blocks = Vec::with_capacity(report.advice.len());
    for (advice, rendered) in report.advice.iter().zip(&report.rendered) {
        let f = &advice.forecast;
        let day = f.event_day.map_or_else(|| "-".to_string(), |d| d.to_string());
        let decision = match advice.decision {
            ScaleDecision::ScaleTo(n) => format!("scale to {n} replicas"),
            ScaleDecision::NoChange => "no change".to_string(),
        };
        blocks.push(format!(
            "{} (day {day}) at {}: predicted {:.1} (baseline {:.1}), confidence {:.2} [{}]\n{rendered}\n  Decision: {decision}\n  Advisory: {} / {}: {}\n  Pending approval: {}",
            f.event,
            f.event_time,
            f.predicted_traffic,
            f.baseline_traffic,
            f.confidence,
            advice.confidence_level,
            advice.advisory.priority,
            advice.advisory.action,
            advice.advisory.reasoning,
            advice.event_key,
        ));
    }
    blocks.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{at, context, write_history};
    use crate::commands::train::{self, TrainArgs};
    use crescent_core::SurgeWindow;
    use crescent_state::EventStatus;

    fn trained(dir: &Path) -> Context {
        let ctx = context(dir);
        let input = write_history(dir, 15);
        train::run(
            &ctx,
            &TrainArgs {
                tenant: "test_ngo",
                input: &input,
                min_training_days: Some(7),
                year: None,
                trained_at: Some(at(3, 20, 0)),
            },
        )
        .unwrap();
        ctx
    }

    fn args(at: NaiveDateTime) -> ForecastArgs<'static> {
        ForecastArgs {
            tenant: "test_ngo",
            at,
            traffic: 120.0,
            current_units: 1,
            history: None,
            min_unit_change: 2,
            recorded_at: Some(at),
        }
    }

    #[test]
    fn breaking_fast_trigger_produces_a_scale_up() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = trained(dir.path());

        let report = run(&ctx, &args(at(2, 26, 15))).unwrap();
        assert_eq!(report.advice.len(), 1);

        let advice = &report.advice[0];
        assert_eq!(advice.forecast.event, SurgeWindow::BreakingFast);
        assert_eq!(advice.forecast.event_day, Some(10));
        assert!(advice.forecast.predicted_traffic > advice.forecast.baseline_traffic);
        assert!(advice.recommendation.recommended_units > 1);
        assert!(advice.recommendation.reason.starts_with("breaking-fast in 3.0h"));
        assert_eq!(
            advice.decision,
            ScaleDecision::ScaleTo(advice.recommendation.recommended_units)
        );
        assert!(advice.should_scale);
        assert!(render(&report).contains("Scaling Recommendation:"));
    }

    #[test]
    fn each_recommendation_is_logged_pending() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = trained(dir.path());

        let report = run(&ctx, &args(at(2, 26, 15))).unwrap();
        let advice = &report.advice[0];
        assert_eq!(advice.event_key, "test_ngo:20260226T150000.000000:breaking-fast");
        // Not a trigger hour, so nothing is logged.
        run(&ctx, &args(at(2, 26, 11))).unwrap();

        let store = ctx.open_store().unwrap();
        let events = store.list_events("test_ngo", 50).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.status, EventStatus::Pending);
        assert_eq!(event.event_type, "breaking-fast");
        assert_eq!(event.current_units, 1);
        assert_eq!(event.recommended_units, advice.recommendation.recommended_units);
        assert_eq!(event.reason, advice.recommendation.reason);
        assert_eq!(event.confidence, advice.forecast.confidence);
    }

    #[test]
    fn quiet_hour_has_nothing_to_recommend() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = trained(dir.path());

        let report = run(&ctx, &args(at(2, 26, 11))).unwrap();
        assert!(report.advice.is_empty());
        assert!(render(&report).starts_with("No surge forecast"));
    }

    #[test]
    fn final_phase_is_critical() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = trained(dir.path());

        let report = run(&ctx, &args(at(3, 10, 17))).unwrap();
        assert_eq!(report.advice.len(), 1);
        let advisory = &report.advice[0].advisory;
        assert_eq!(advisory.priority, crate::advisory::Priority::Critical);
        assert!(advisory.action_required);
    }

    #[test]
    fn history_file_feeds_data_quality() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = trained(dir.path());
        let history = dir.path().join("history.json");

        let without = run(&ctx, &args(at(2, 26, 15))).unwrap();
        let with = run(
            &ctx,
            &ForecastArgs {
                history: Some(&history),
                ..args(at(2, 26, 15))
            },
        )
        .unwrap();
        assert!(with.advice[0].forecast.confidence > without.advice[0].forecast.confidence);
    }

    #[test]
    fn unknown_tenant_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = run(&ctx, &args(at(2, 26, 15))).unwrap_err();
        assert!(err.to_string().contains("no trained model"));
    }
}
