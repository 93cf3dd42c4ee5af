use chrono::NaiveDate;
use forecast_accuracy::{
    align_history, Attributes, FeatureValue, PastActual, PastForecast, SeriesKey,
};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
}

fn forecast(key: &SeriesKey, d: u32, value: f64, attributes: Attributes) -> PastForecast {
    PastForecast {
        key: key.clone(),
        date: day(d),
        forecast: Some(value),
        lead_time: Some(5.0),
        service_level: Some(0.9),
        attributes,
    }
}

fn actual(key: &SeriesKey, d: u32, value: f64, attributes: Attributes) -> PastActual {
    PastActual {
        key: key.clone(),
        date: day(d),
        actual: Some(value),
        attributes,
    }
}

#[test]
fn test_inner_join_on_key_and_date() {
    let a = SeriesKey::new("A", "L1", "DC");
    let b = SeriesKey::new("B", "L1", "DC");

    let forecasts = vec![
        forecast(&a, 1, 100.0, Attributes::new()),
        forecast(&a, 2, 110.0, Attributes::new()),
        forecast(&b, 1, 50.0, Attributes::new()),
    ];
    let actuals = vec![
        actual(&a, 2, 105.0, Attributes::new()),
        actual(&a, 1, 95.0, Attributes::new()),
        actual(&b, 3, 40.0, Attributes::new()),
    ];

    let aligned = align_history(&forecasts, &actuals);
    assert_eq!(aligned.len(), 2);
    assert_eq!(aligned[0].date, day(1));
    assert_eq!(aligned[0].forecast, Some(100.0));
    assert_eq!(aligned[0].actual, Some(95.0));
    assert_eq!(aligned[0].lead_time, Some(5.0));
    assert_eq!(aligned[1].actual, Some(105.0));
}

#[test]
fn test_colliding_attributes_are_suffixed() {
    let key = SeriesKey::new("A", "L1", "DC");
    let mut fa = Attributes::new();
    fa.insert("promo".to_string(), FeatureValue::Numeric(1.0));
    fa.insert("region".to_string(), FeatureValue::Category("N".to_string()));
    let mut aa = Attributes::new();
    aa.insert("promo".to_string(), FeatureValue::Numeric(0.0));

    let aligned = align_history(&[forecast(&key, 1, 10.0, fa)], &[actual(&key, 1, 9.0, aa)]);
    let attrs = &aligned[0].attributes;
    assert_eq!(attrs.get("promo_fcst"), Some(&FeatureValue::Numeric(1.0)));
    assert_eq!(attrs.get("promo_act"), Some(&FeatureValue::Numeric(0.0)));
    assert!(attrs.contains_key("region"));
    assert!(!attrs.contains_key("promo"));
}

#[test]
fn test_echelon_level_keys_join_with_each_other() {
    let key = SeriesKey::echelon_level("A", "DC");
    let aligned = align_history(
        &[forecast(&key, 1, 10.0, Attributes::new())],
        &[actual(&key, 1, 8.0, Attributes::new())],
    );
    assert_eq!(aligned.len(), 1);
}
