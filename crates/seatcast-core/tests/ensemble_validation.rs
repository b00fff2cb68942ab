//! End-to-end tests for the statistical forecast pipeline
//!
//! Runs the model adapters, ensemble combiner, cross-validator, and
//! weight optimizer together on small hand-checkable series.

use seatcast_core::ensemble::{
    calculate_sections, combine, ensemble_forecast, ModelWeights,
};
use seatcast_core::models::ModelKind;
use seatcast_core::optimizer::{optimize_weights, OptimizationMetric};
use seatcast_core::validation::cross_validate;
use std::collections::BTreeMap;

fn trending_series() -> Vec<f64> {
    (1..=20).map(|x| 40.0 + x as f64).collect()
}

#[test]
fn e2e_three_models_blend_on_trending_series() {
    let series = trending_series();
    let result = ensemble_forecast(&series, 3, &ModelWeights::default());

    assert!(result.failed_models.is_empty());
    assert_eq!(result.predictions.len(), 3);
    assert_eq!(result.combined.len(), 3);
    assert!(result.combined.iter().all(|v| v.is_finite()));

    // The seasonal-trend model recovers the line exactly.
    let prophet = &result.predictions[&ModelKind::Prophet];
    assert!((prophet[0] - 61.0).abs() < 1e-9);
    assert!((prophet[2] - 63.0).abs() < 1e-9);

    // A weighted average stays inside the per-step model range.
    for h in 0..3 {
        let values: Vec<f64> = result.predictions.values().map(|p| p[h]).collect();
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(result.combined[h] >= min - 1e-9);
        assert!(result.combined[h] <= max + 1e-9);
    }
    assert!(result.combined[2] > result.combined[0]);
}

#[test]
fn e2e_short_history_degrades_through_fallback_chains() {
    // Three observations: seasonal and ARIMA configurations cannot fit,
    // so prophet and ets land on their linear fallbacks (exact on a
    // line) while arima degrades all the way to the mean.
    let result = ensemble_forecast(&[50.0, 52.0, 54.0], 3, &ModelWeights::default());

    assert!(result.failed_models.is_empty());
    let arima = &result.predictions[&ModelKind::Arima];
    assert!((arima[0] - 52.0).abs() < 1e-9);
    assert!((arima[2] - 52.0).abs() < 1e-9);

    // 0.40 x 56 + 0.35 x 56 + 0.25 x 52 = 55.0, then 56.5, 58.0.
    assert!((result.combined[0] - 55.0).abs() < 1e-9);
    assert!((result.combined[1] - 56.5).abs() < 1e-9);
    assert!((result.combined[2] - 58.0).abs() < 1e-9);
}

#[test]
fn e2e_cross_validation_scores_the_ensemble() {
    let series = trending_series();
    let report = cross_validate(&series, 8, 1, 1, |train, horizon| {
        ensemble_forecast(train, horizon, &ModelWeights::default()).combined
    })
    .unwrap();

    assert_eq!(report.scores.len(), 12);
    assert_eq!(report.skipped_folds, 0);
    assert_eq!(report.scores[0].train_size, 8);
    assert_eq!(report.scores[11].train_size, 19);

    // Smoothing carries a small transient error on a pure line; the
    // exact trend and ARIMA forecasts keep the blend close.
    assert!(report.mae_mean > 0.0);
    assert!(report.mae_mean < 1.5);
    // With a one-step horizon each fold's RMSE equals its MAE.
    assert!((report.rmse_mean - report.mae_mean).abs() < 1e-12);
    let mape = report.mape_mean.unwrap();
    assert!(mape > 0.0 && mape < 5.0);
}

#[test]
fn e2e_weight_search_prefers_the_exact_models() {
    let series = trending_series();
    let result = optimize_weights(&series, 8, 1, 1, 0.5, OptimizationMetric::default()).unwrap();

    assert_eq!(result.combinations, 6);
    assert_eq!(result.folds, 12);
    assert_eq!(result.metric, OptimizationMetric::RMSE);
    // Every winning combination excludes the inexact smoothing model.
    assert_eq!(result.weights.ets, 0.0);
    assert!(result.score < 1e-6);
}

#[test]
fn e2e_blended_prediction_to_sections() {
    let mut predictions = BTreeMap::new();
    predictions.insert(ModelKind::Prophet, 100.0);
    predictions.insert(ModelKind::Ets, f64::NAN);
    predictions.insert(ModelKind::Arima, 90.0);

    let blended = combine(&predictions, &ModelWeights::default());
    assert!((blended - 96.153_846).abs() < 1e-5);

    // Buffer shrinks capacity to 18, so 96.15 seats need 6 sections.
    assert_eq!(calculate_sections(blended, 20, 10.0), 6);
}
