use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use forecast_accuracy::{FutureRecord, HistoryRecord, SeriesKey};
use rstest::rstest;
use safety_stock::estimators::error_based::{mae_safety_stock, rmse_safety_stock};
use safety_stock::estimators::hybrid::{hybrid_safety_stock, rmse_weight};
use safety_stock::estimators::rule_based::{
    rule_based_table, rule_ss_from_forecast, rule_ss_from_history,
};
use safety_stock::{HistoryIndex, SafetyStockError, SeriesHistory};
use stock_math::MathError;

fn history(key: &SeriesKey, pairs: &[(f64, f64)], lead_times: &[f64]) -> Vec<HistoryRecord> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, &(forecast, actual))| HistoryRecord {
            key: key.clone(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap(),
            forecast: Some(forecast),
            actual: Some(actual),
            lead_time: lead_times.get(i).copied(),
            service_level: Some(0.95),
            attributes: Default::default(),
        })
        .collect()
}

fn series_a() -> Vec<HistoryRecord> {
    history(
        &SeriesKey::new("A", "L1", "DC"),
        &[(100.0, 90.0), (100.0, 110.0), (100.0, 100.0)],
        &[3.0, 5.0, 4.0],
    )
}

fn future(key: SeriesKey, forecast: f64, lead_time: Option<f64>) -> FutureRecord {
    FutureRecord {
        key,
        date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        forecast,
        lead_time,
        service_level: Some(0.95),
        attributes: Default::default(),
    }
}

#[test]
fn test_rule_from_forecast_scenario() {
    // 1.645 * sqrt(36) * sqrt(9)
    assert_approx_eq!(rule_ss_from_forecast(36.0, 9.0, 0.95).unwrap(), 29.61);
    // percent-scale service level gives the same z
    assert_approx_eq!(rule_ss_from_forecast(36.0, 9.0, 95.0).unwrap(), 29.61);
}

#[test]
fn test_rule_from_forecast_negative_forecast_is_zero() {
    assert_eq!(rule_ss_from_forecast(-4.0, 9.0, 0.95).unwrap(), 0.0);
}

#[test]
fn test_rule_from_history_uses_demand_spread() {
    let records = series_a();
    let series = SeriesHistory::from_records(&records);
    assert_approx_eq!(rule_ss_from_history(&series, 4.0, 0.95).unwrap(), 26.86);
}

#[test]
fn test_rule_from_history_needs_two_points() {
    let records = history(&SeriesKey::new("A", "L1", "DC"), &[(10.0, 10.0)], &[]);
    let single = SeriesHistory::from_records(&records);
    let empty = SeriesHistory::from_records(&[] as &[HistoryRecord]);
    for series in [single, empty] {
        assert!(matches!(
            rule_ss_from_history(&series, 4.0, 0.95),
            Err(SafetyStockError::Math(MathError::InsufficientData(_)))
        ));
    }
}

#[test]
fn test_rule_table_picks_variant_per_series() {
    let records = series_a();
    let index = HistoryIndex::new(&records);
    let rows = vec![
        future(SeriesKey::new("A", "L1", "DC"), 36.0, Some(4.0)),
        future(SeriesKey::new("Z", "L1", "DC"), 36.0, Some(9.0)),
    ];

    let table = rule_based_table(&rows, Some(&index)).unwrap();
    assert_eq!(table.len(), 2);
    assert_approx_eq!(table[0].value, 26.86);
    assert_approx_eq!(table[1].value, 29.61);
}

#[test]
fn test_rule_table_missing_lead_time_is_schema_error() {
    let rows = vec![future(SeriesKey::new("A", "L1", "DC"), 36.0, None)];
    let err = rule_based_table(&rows, None).unwrap_err();

    match err {
        SafetyStockError::MissingField { key, field } => {
            assert_eq!(key, SeriesKey::new("A", "L1", "DC"));
            assert_eq!(field, "lead_time");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_rmse_safety_stock() {
    let records = series_a();
    let series = SeriesHistory::from_records(&records);
    let ss = rmse_safety_stock(&series, 4.0, 0.95).unwrap();

    assert_approx_eq!(ss.no_var, 26.86);
    assert_approx_eq!(ss.with_var.unwrap(), 28.31);
}

#[test]
fn test_mae_safety_stock() {
    let records = series_a();
    let series = SeriesHistory::from_records(&records);
    let ss = mae_safety_stock(&series, 4.0, 0.95).unwrap();

    assert_approx_eq!(ss.no_var, 27.41);
    assert_approx_eq!(ss.with_var.unwrap(), 28.84);
}

#[test]
fn test_hybrid_equal_components() {
    let records = series_a();
    let series = SeriesHistory::from_records(&records);
    let ss = hybrid_safety_stock(&series, 4.0, 0.95).unwrap();

    // RMSE and demand spread coincide for series A
    assert_approx_eq!(ss.weight_rmse, 0.5);
    assert_approx_eq!(ss.no_var, 26.86);
    assert_approx_eq!(ss.with_var.unwrap(), 136.96);
}

#[test]
fn test_hybrid_weighted_blend() {
    let records = history(
        &SeriesKey::new("H", "L1", "DC"),
        &[(30.0, 20.0), (30.0, 30.0), (30.0, 20.0), (30.0, 30.0)],
        &[],
    );
    let series = SeriesHistory::from_records(&records);
    let ss = hybrid_safety_stock(&series, 4.0, 0.95).unwrap();

    assert_approx_eq!(ss.weight_rmse, 0.41);
    assert_approx_eq!(ss.no_var, 19.27);
    assert!(ss.with_var.is_none());
}

#[test]
fn test_hybrid_perfect_flat_history_uses_fallback_weight() {
    let records = history(
        &SeriesKey::new("F", "L1", "DC"),
        &[(10.0, 10.0), (10.0, 10.0), (10.0, 10.0)],
        &[2.0, 2.0, 2.0],
    );
    let series = SeriesHistory::from_records(&records);
    let ss = hybrid_safety_stock(&series, 4.0, 0.95).unwrap();

    assert_eq!(ss.weight_rmse, 0.5);
    assert_eq!(ss.no_var, 0.0);
}

#[rstest]
#[case(0.0, 0.0)]
#[case(1.0, 0.0)]
#[case(0.0, 1.0)]
#[case(3.5, 12.0)]
#[case(1e6, 1e-6)]
fn test_hybrid_weight_in_unit_interval(#[case] rmse: f64, #[case] sigma: f64) {
    let w = rmse_weight(rmse, sigma);
    assert!((0.0..=1.0).contains(&w));
}
