//! Train on synthetic in-period traffic and query the forecaster at
//! trigger hours.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use crescent_core::{FeatureOptions, Sample, SurgeWindow, Tabular, TimeSeries};
use crescent_forecast::{HybridForecaster, ModelSummary};

fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

/// Minutely traffic from the first day of the 2026 period: ~100 req/min
/// with a ~400 req/min breaking-fast spike between 18:00 and 20:59.
fn synthetic(days: i64) -> TimeSeries {
    let start = at(2, 17, 0);
    let samples = (0..days * 1_440)
        .map(|i| {
            let ts = start + Duration::minutes(i);
            let noise = ((i * 7_919) % 13) as f64 - 6.0;
            let minute_of_day = i % 1_440;
            let level = if (18 * 60..21 * 60).contains(&minute_of_day) {
                400.0
            } else {
                100.0
            };
            Sample::new(ts, level + noise)
        })
        .collect();
    TimeSeries::new(samples).unwrap()
}

fn trained(days: i64) -> HybridForecaster {
    let mut forecaster = HybridForecaster::default();
    forecaster
        .train_series(&synthetic(days), &FeatureOptions::for_year(2026).keep_all_rows())
        .unwrap();
    forecaster
}

#[test]
fn breaking_fast_forecast_at_trigger_hour() {
    let forecaster = trained(15);
    // Day 10, 15:00.
    let forecasts = forecaster.forecast(at(2, 26, 15), 120.0, None).unwrap();

    assert_eq!(forecasts.len(), 1);
    let f = &forecasts[0];
    assert_eq!(f.event, SurgeWindow::BreakingFast);
    assert_eq!(f.event_day, Some(10));
    assert_eq!(f.event_time, at(2, 26, 18));
    assert_eq!(f.time_to_impact_hours, 3.0);
    assert!(f.time_to_impact_hours <= 4.0);
    assert!((f.predicted_traffic - f.baseline_traffic * f.multiplier).abs() < 1e-9);

    assert!(f.used_learned);
    assert!(f.confidence >= 0.70 && f.confidence <= 0.99);
    // Spike is roughly four times the midday level.
    assert!(f.multiplier > 3.5 && f.multiplier < 4.5, "multiplier {}", f.multiplier);
    assert!(f.baseline_traffic > 350.0);
}

#[test]
fn non_trigger_hours_produce_nothing() {
    let forecaster = trained(15);
    for hour in [0, 1, 3, 10, 14, 16, 18, 19, 23] {
        let forecasts = forecaster.forecast(at(2, 26, hour), 100.0, None).unwrap();
        assert!(forecasts.is_empty(), "hour {hour}");
    }
}

#[test]
fn each_window_fires_at_its_own_trigger_hour() {
    let forecaster = trained(15);
    let expected = [
        (2, SurgeWindow::DawnMeal, 4),
        (15, SurgeWindow::BreakingFast, 18),
        (17, SurgeWindow::NightPrayer, 20),
    ];
    for (trigger, window, event_hour) in expected {
        let forecasts = forecaster.forecast(at(3, 1, trigger), 100.0, None).unwrap();
        assert_eq!(forecasts.len(), 1);
        assert_eq!(forecasts[0].event, window);
        assert_eq!(forecasts[0].event_time, at(3, 1, event_hour));
    }
}

#[test]
fn outside_event_period_is_empty() {
    let forecaster = trained(15);
    assert!(forecaster.forecast(at(2, 16, 15), 100.0, None).unwrap().is_empty());
    assert!(forecaster.forecast(at(3, 19, 15), 100.0, None).unwrap().is_empty());
}

#[test]
fn complete_history_raises_confidence() {
    let forecaster = trained(15);
    let history = synthetic(2);
    let with = forecaster.forecast(at(2, 26, 15), 100.0, Some(&history)).unwrap();
    let without = forecaster.forecast(at(2, 26, 15), 100.0, None).unwrap();
    // Full quality (1.0) versus the 0.8 default.
    assert!(with[0].confidence > without[0].confidence);
}

/// Advertises a column it cannot report on.
struct Broken;

impl Tabular for Broken {
    fn row_count(&self) -> usize {
        10
    }

    fn column_names(&self) -> Vec<&'static str> {
        vec!["value"]
    }

    fn missing_in(&self, _column: &str) -> Option<usize> {
        None
    }
}

#[test]
fn data_quality_failure_falls_back_to_default() {
    let forecaster = trained(15);
    let broken = forecaster.forecast(at(2, 26, 15), 100.0, Some(&Broken)).unwrap();
    let default = forecaster.forecast(at(2, 26, 15), 100.0, None).unwrap();
    assert_eq!(broken, default);
}

#[test]
fn few_training_days_lower_confidence() {
    let sparse = trained(2).forecast(at(2, 26, 15), 100.0, None).unwrap();
    let rich = trained(15).forecast(at(2, 26, 15), 100.0, None).unwrap();
    assert!(sparse[0].confidence < rich[0].confidence);
}

#[test]
fn model_summary_reports_trained_state() {
    let summary = trained(15).model_summary();
    let ModelSummary::Trained {
        baseline,
        patterns,
        forecast_horizon_hours,
        trigger_rules,
    } = summary
    else {
        panic!("expected trained summary");
    };
    assert_eq!(forecast_horizon_hours, 4);
    assert_eq!(trigger_rules.len(), 3);
    assert_eq!(patterns.total_days_analyzed, 15);
    assert_eq!(baseline.unwrap().hours_covered, 24);
}

#[test]
fn trained_forecaster_survives_serialization() {
    let forecaster = trained(5);
    let json = serde_json::to_string(&forecaster).unwrap();
    let restored: HybridForecaster = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, forecaster);
    assert_eq!(
        restored.forecast(at(2, 20, 15), 100.0, None).unwrap(),
        forecaster.forecast(at(2, 20, 15), 100.0, None).unwrap()
    );
}

#[test]
fn tenants_do_not_share_state() {
    let a = trained(15);
    let mut b = HybridForecaster::default();
    assert!(b.forecast(at(2, 26, 15), 100.0, None).is_err());

    b.train_series(
        &synthetic(3),
        &FeatureOptions::for_year(2026).keep_all_rows(),
    )
    .unwrap();
    assert_ne!(a.patterns(), b.patterns());
    assert_eq!(a.patterns().daily_patterns.len(), 15);
}
