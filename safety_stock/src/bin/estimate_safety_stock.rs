use clap::Parser;
use forecast_accuracy::{align_history, CsvLoader};
use safety_stock::{run_pipeline, write_merged_csv, write_metrics_csv, MethodChoice, RunConfig};
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "estimate_safety_stock")]
#[command(about = "Estimate safety stock from demand forecasts and sales history", long_about = None)]
struct Args {
    /// Future forecast CSV
    #[arg(long)]
    future: PathBuf,

    /// Past forecast CSV
    #[arg(long, requires = "past_actual")]
    past_forecast: Option<PathBuf>,

    /// Past actual sales CSV
    #[arg(long, requires = "past_forecast")]
    past_actual: Option<PathBuf>,

    /// JSON run configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Estimation method (rule-only, ml-only, both, segmented)
    #[arg(long, value_parser = parse_method)]
    method: Option<MethodChoice>,

    /// Add the Bayesian estimate to `both` runs
    #[arg(long)]
    bayesian: bool,

    /// Merged results CSV (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Accuracy metrics CSV
    #[arg(long)]
    metrics: Option<PathBuf>,
}

fn parse_method(value: &str) -> Result<MethodChoice, String> {
    value.parse().map_err(|e: safety_stock::SafetyStockError| e.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => RunConfig::from_json_file(path)?,
        None => RunConfig::default(),
    };
    if let Some(method) = args.method {
        config.method_choice = method;
    }
    config.include_bayesian |= args.bayesian;

    let loader = CsvLoader::new(config.columns.clone());
    let future = loader.future_forecasts(BufReader::new(File::open(&args.future)?))?;

    let history = match (&args.past_forecast, &args.past_actual) {
        (Some(forecast_path), Some(actual_path)) => {
            let forecasts = loader.past_forecasts(BufReader::new(File::open(forecast_path)?))?;
            let actuals = loader.past_actuals(BufReader::new(File::open(actual_path)?))?;
            config.past_forecast_available = true;
            config.past_sales_available = true;
            Some(align_history(&forecasts, &actuals))
        }
        _ => None,
    };

    info!(method = %config.method_choice, has_past = config.has_past_data(), "starting run");
    let output = run_pipeline(&config, history.as_deref(), &future)?;

    match &args.output {
        Some(path) => write_merged_csv(&output.results, BufWriter::new(File::create(path)?))?,
        None => write_merged_csv(&output.results, io::stdout().lock())?,
    }
    if let Some(path) = &args.metrics {
        write_metrics_csv(
            &output.metrics,
            &output.segmentation,
            BufWriter::new(File::create(path)?),
        )?;
    }

    info!(rows = output.results.len(), "safety stock written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_full_argument_list() {
        let args = Args::try_parse_from([
            "estimate_safety_stock",
            "--future",
            "future.csv",
            "--past-forecast",
            "past_forecast.csv",
            "--past-actual",
            "past_actual.csv",
            "--method",
            "segmented",
            "--bayesian",
            "--output",
            "out.csv",
            "--metrics",
            "metrics.csv",
        ])
        .unwrap();

        assert_eq!(args.future, PathBuf::from("future.csv"));
        assert_eq!(args.past_forecast, Some(PathBuf::from("past_forecast.csv")));
        assert_eq!(args.past_actual, Some(PathBuf::from("past_actual.csv")));
        assert_eq!(args.method, Some(MethodChoice::Segmented));
        assert!(args.bayesian);
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
        assert_eq!(args.metrics, Some(PathBuf::from("metrics.csv")));
        assert_eq!(args.config, None);
    }

    #[test]
    fn test_defaults_with_future_only() {
        let args = Args::try_parse_from(["estimate_safety_stock", "--future", "f.csv"]).unwrap();
        assert_eq!(args.method, None);
        assert!(!args.bayesian);
        assert_eq!(args.past_forecast, None);
        assert_eq!(args.output, None);
    }

    #[test]
    fn test_method_aliases() {
        let args = Args::try_parse_from([
            "estimate_safety_stock",
            "--future",
            "f.csv",
            "--method",
            "ML + Rule-based",
        ])
        .unwrap();
        assert_eq!(args.method, Some(MethodChoice::Both));
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let missing_future = Args::try_parse_from(["estimate_safety_stock"]).unwrap_err();
        assert_eq!(missing_future.kind(), ErrorKind::MissingRequiredArgument);

        let unknown_method = Args::try_parse_from([
            "estimate_safety_stock",
            "--future",
            "f.csv",
            "--method",
            "magic",
        ])
        .unwrap_err();
        assert_eq!(unknown_method.kind(), ErrorKind::ValueValidation);

        let lone_history = Args::try_parse_from([
            "estimate_safety_stock",
            "--future",
            "f.csv",
            "--past-forecast",
            "p.csv",
        ])
        .unwrap_err();
        assert_eq!(lone_history.kind(), ErrorKind::MissingRequiredArgument);
    }
}
