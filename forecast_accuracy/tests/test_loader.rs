use assert_approx_eq::assert_approx_eq;
use chrono::NaiveDate;
use forecast_accuracy::{AccuracyError, ColumnMapping, CsvLoader, FeatureValue, SeriesKey};
use pretty_assertions::assert_eq;

const FUTURE_CSV: &str = "\
SKU_ID, Location_ID ,Echelon_Type,Date,Forecasted_Demand,Lead_Time_Days,Service_Level,Region
A,L1,DC,2024-02-01,36,9,95,North
A,L1,DC,2024-02-02,abc,9,95,North
B,,Store,02/02/2024,12.5,4,0.9,South
,L1,DC,2024-02-03,10,4,0.9,South
";

#[test]
fn test_future_forecasts_with_default_mapping() {
    let loader = CsvLoader::default();
    let rows = loader.future_forecasts(FUTURE_CSV.as_bytes()).unwrap();

    // non-numeric forecast and missing sku are dropped
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].key, SeriesKey::new("A", "L1", "DC"));
    assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_approx_eq!(rows[0].forecast, 36.0);
    assert_eq!(rows[0].lead_time, Some(9.0));
    assert_approx_eq!(rows[0].service_level.unwrap(), 0.95);
    assert_eq!(
        rows[0].attributes.get("region"),
        Some(&FeatureValue::Category("North".to_string()))
    );

    // empty location is an echelon-level series
    assert_eq!(rows[1].key, SeriesKey::echelon_level("B", "Store"));
    assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
}

#[test]
fn test_missing_service_level_defaults() {
    let csv = "sku_id,location_id,echelon_type,date,forecast,lead_time\nA,L1,DC,2024-02-01,10,3\n";
    let loader = CsvLoader::new(ColumnMapping::identity());
    let rows = loader.future_forecasts(csv.as_bytes()).unwrap();
    assert_eq!(rows[0].service_level, Some(0.95));
}

#[test]
fn test_missing_required_column_is_schema_error() {
    let csv = "sku_id,location_id,echelon_type,date,forecast\nA,L1,DC,2024-02-01,10\n";
    let loader = CsvLoader::new(ColumnMapping::identity());

    match loader.future_forecasts(csv.as_bytes()) {
        Err(AccuracyError::MissingColumn { table, column }) => {
            assert_eq!(table, "future_forecast");
            assert_eq!(column, "lead_time");
        }
        other => panic!("Expected MissingColumn, got {:?}", other),
    }

    let err = loader.past_actuals(csv.as_bytes()).unwrap_err();
    assert!(err.to_string().contains("actual"));
}

#[test]
fn test_past_tables_keep_non_numeric_values_as_null() {
    let forecasts = "sku_id,location_id,echelon_type,date,forecast,lead_time,promo\n\
                     A,L1,DC,2024-01-01,100,7,1\n\
                     A,L1,DC,2024-01-02,n/a,7,0\n\
                     A,L1,DC,2024-01-03,,7,0\n";
    let actuals = "sku_id,location_id,echelon_type,date,actual\n\
                   A,L1,DC,2024-01-01,90\n\
                   A,L1,DC,2024-01-02,oops\n\
                   A,L1,DC,bad-date,5\n";
    let loader = CsvLoader::new(ColumnMapping::identity());

    let past_forecasts = loader.past_forecasts(forecasts.as_bytes()).unwrap();
    assert_eq!(past_forecasts.len(), 2);
    assert_eq!(past_forecasts[0].forecast, Some(100.0));
    assert_eq!(past_forecasts[1].forecast, None);
    assert_eq!(
        past_forecasts[0].attributes.get("promo"),
        Some(&FeatureValue::Numeric(1.0))
    );

    let past_actuals = loader.past_actuals(actuals.as_bytes()).unwrap();
    assert_eq!(past_actuals.len(), 2);
    assert_eq!(past_actuals[1].actual, None);
}
