use forecast_accuracy::{align_history, CsvLoader};
use pretty_assertions::assert_eq;
use safety_stock::{run_pipeline, write_merged_csv, write_metrics_csv, MethodChoice, RunConfig};
use std::fs::File;
use std::io::{BufReader, BufWriter};

const PAST_FORECAST: &str = "\
SKU_ID,Location_ID,Echelon_Type,Date,Forecasted_Demand,Lead_Time_Days,Service_Level
A,L1,DC,2024-01-01,100,9,95
A,L1,DC,2024-01-02,100,9,95
A,L1,DC,2024-01-03,100,9,95
B,L1,DC,2024-01-01,50,9,95
B,L1,DC,2024-01-02,50,9,95
";

const PAST_ACTUAL: &str = "\
SKU_ID,Location_ID,Echelon_Type,Date,Actual_Sales
A,L1,DC,2024-01-01,90
A,L1,DC,2024-01-02,110
A,L1,DC,2024-01-03,100
B,L1,DC,2024-01-01,10
B,L1,DC,2024-01-02,10
";

const FUTURE: &str = "\
SKU_ID,Location_ID,Echelon_Type,Date,Forecasted_Demand,Lead_Time_Days,Service_Level,Region
A,L1,DC,2024-02-01,100,9,95,North
B,L1,DC,2024-02-01,36,9,95,South
C,L1,DC,2024-02-01,36,9,95,South
";

fn read_back(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_segmented_run_round_trips_through_csv() {
    let loader = CsvLoader::default();
    let forecasts = loader.past_forecasts(PAST_FORECAST.as_bytes()).unwrap();
    let actuals = loader.past_actuals(PAST_ACTUAL.as_bytes()).unwrap();
    let future = loader.future_forecasts(FUTURE.as_bytes()).unwrap();
    let history = align_history(&forecasts, &actuals);
    assert_eq!(history.len(), 5);

    let mut config = RunConfig::from_choice(true, "segmented").unwrap();
    config.method_choice = MethodChoice::Segmented;
    let output = run_pipeline(&config, Some(history.as_slice()), &future).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let results_path = dir.path().join("results.csv");
    let metrics_path = dir.path().join("metrics.csv");
    write_merged_csv(
        &output.results,
        BufWriter::new(File::create(&results_path).unwrap()),
    )
    .unwrap();
    write_metrics_csv(
        &output.metrics,
        &output.segmentation,
        BufWriter::new(File::create(&metrics_path).unwrap()),
    )
    .unwrap();

    let results = read_back(&results_path);
    assert_eq!(
        results[0],
        vec![
            "sku_id",
            "location_id",
            "echelon_type",
            "date",
            "forecast",
            "lead_time",
            "service_level",
            "region",
            "rule_ss",
            "rmse_ss",
            "rmse_var_ss",
            "mae_ss",
            "mae_var_ss",
            "hybrid_ss",
            "hybrid_var_ss",
            "final_ss",
            "selected_method",
        ]
    );
    // header plus one row per future row
    assert_eq!(results.len(), 4);
    assert_eq!(results[1][0], "A");
    assert_eq!(results[1][3], "2024-02-01");
    assert_eq!(results[1][7], "North");
    assert_eq!(results[1][16], "Forecast-based");
    assert_eq!(results[2][16], "Rule-based");
    // C has no history: error-based columns are empty, final falls back to rule
    assert_eq!(results[3][9], "");
    assert_eq!(results[3][15], "29.61");
    assert_eq!(results[3][16], "");

    let metrics = read_back(&metrics_path);
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics[0][0], "sku_id");
    assert_eq!(metrics[1][0], "A");
    assert_eq!(metrics[2][0], "B");
    assert_eq!(metrics[2].last().unwrap(), "Rule-based");
}

#[test]
fn test_merged_csv_from_reader_without_history() {
    let loader = CsvLoader::default();
    let future = loader
        .future_forecasts(BufReader::new(FUTURE.as_bytes()))
        .unwrap();

    let output = run_pipeline(&RunConfig::default(), None, &future).unwrap();
    let mut buffer = Vec::new();
    write_merged_csv(&output.results, &mut buffer).unwrap();

    let text = String::from_utf8(buffer).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "sku_id,location_id,echelon_type,date,forecast,lead_time,service_level,region,rule_ss,final_ss"
    );
    assert_eq!(
        lines.nth(1).unwrap(),
        "B,L1,DC,2024-02-01,36,9,0.95,South,29.61,29.61"
    );
}

#[test]
fn test_merged_csv_drops_attributes_named_like_output_columns() {
    // a previous run's output fed back in as the future file
    let rescored = "\
SKU_ID,Location_ID,Echelon_Type,Date,Forecasted_Demand,Lead_Time_Days,Service_Level,Region,forecast,rule_ss,Final_SS
B,L1,DC,2024-02-01,36,9,95,South,40,12.5,12.5
";
    let future = CsvLoader::default()
        .future_forecasts(rescored.as_bytes())
        .unwrap();
    assert!(future[0].attributes.contains_key("rule_ss"));

    let output = run_pipeline(&RunConfig::default(), None, &future).unwrap();
    let mut buffer = Vec::new();
    write_merged_csv(&output.results, &mut buffer).unwrap();

    let text = String::from_utf8(buffer).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next().unwrap(),
        "sku_id,location_id,echelon_type,date,forecast,lead_time,service_level,region,rule_ss,final_ss"
    );
    assert_eq!(
        lines.next().unwrap(),
        "B,L1,DC,2024-02-01,36,9,0.95,South,29.61,29.61"
    );
    assert_eq!(lines.next(), None);
}
