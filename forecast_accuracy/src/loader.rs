//! CSV loading and cleaning for demand tables
//!
//! Headers are trimmed and lower-cased, then renamed to standard names through
//! a [`ColumnMapping`]. Required columns are validated up front; numeric
//! fields that fail to parse become `None`, and rows missing essentials are
//! dropped with a warning. Columns that are not part of the mapping are
//! carried as record attributes.

use crate::data::{Attributes, FeatureValue, FutureRecord, PastActual, PastForecast, SeriesKey};
use crate::error::{AccuracyError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use stock_math::normalize_service_level;
use tracing::{info, warn};

/// Service level assumed when a table has no service-level column
pub const DEFAULT_SERVICE_LEVEL: f64 = 0.95;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Source header for each standard column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub forecast: String,
    pub actual: String,
    pub sku_id: String,
    pub location_id: String,
    pub date: String,
    pub lead_time: String,
    pub echelon_type: String,
    pub service_level: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            forecast: "Forecasted_Demand".to_string(),
            actual: "Actual_Sales".to_string(),
            sku_id: "SKU_ID".to_string(),
            location_id: "Location_ID".to_string(),
            date: "Date".to_string(),
            lead_time: "Lead_Time_Days".to_string(),
            echelon_type: "Echelon_Type".to_string(),
            service_level: "Service_Level".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Mapping for tables that already use the standard names
    pub fn identity() -> Self {
        Self {
            forecast: "forecast".to_string(),
            actual: "actual".to_string(),
            sku_id: "sku_id".to_string(),
            location_id: "location_id".to_string(),
            date: "date".to_string(),
            lead_time: "lead_time".to_string(),
            echelon_type: "echelon_type".to_string(),
            service_level: "service_level".to_string(),
        }
    }

    fn pairs(&self) -> [(&'static str, &str); 8] {
        [
            ("forecast", &self.forecast),
            ("actual", &self.actual),
            ("sku_id", &self.sku_id),
            ("location_id", &self.location_id),
            ("date", &self.date),
            ("lead_time", &self.lead_time),
            ("echelon_type", &self.echelon_type),
            ("service_level", &self.service_level),
        ]
    }
}

/// Raw table with standard column positions resolved
struct RawTable {
    name: &'static str,
    columns: HashMap<&'static str, usize>,
    extra: Vec<(String, usize)>,
    rows: Vec<csv::StringRecord>,
}

impl RawTable {
    fn read<R: Read>(name: &'static str, reader: R, mapping: &ColumnMapping) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut columns = HashMap::new();
        let mut mapped = vec![false; headers.len()];
        for (standard, source) in mapping.pairs() {
            let source = source.trim().to_lowercase();
            if let Some(pos) = headers
                .iter()
                .position(|h| *h == source || h == standard)
            {
                columns.insert(standard, pos);
                mapped[pos] = true;
            }
        }

        let extra = headers
            .iter()
            .enumerate()
            .filter(|(pos, _)| !mapped[*pos])
            .map(|(pos, h)| (h.clone(), pos))
            .collect();

        let rows = csv_reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            columns,
            extra,
            rows,
        })
    }

    fn require(&self, required: &[&str]) -> Result<()> {
        for column in required {
            if !self.columns.contains_key(column) {
                return Err(AccuracyError::MissingColumn {
                    table: self.name.to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }

    fn field<'r>(&self, row: &'r csv::StringRecord, column: &str) -> Option<&'r str> {
        self.columns
            .get(column)
            .and_then(|&pos| row.get(pos))
            .filter(|v| !v.is_empty())
    }

    fn number(&self, row: &csv::StringRecord, column: &str) -> Option<f64> {
        self.field(row, column).and_then(parse_number)
    }

    fn key(&self, row: &csv::StringRecord) -> Option<SeriesKey> {
        Some(SeriesKey {
            sku_id: self.field(row, "sku_id")?.to_string(),
            location_id: self.field(row, "location_id").map(str::to_string),
            echelon_type: self.field(row, "echelon_type")?.to_string(),
        })
    }

    fn date(&self, row: &csv::StringRecord) -> Option<NaiveDate> {
        self.field(row, "date").and_then(parse_date)
    }

    fn attributes(&self, row: &csv::StringRecord) -> Attributes {
        self.extra
            .iter()
            .filter_map(|(name, pos)| {
                let raw = row.get(*pos).filter(|v| !v.is_empty())?;
                let value = match parse_number(raw) {
                    Some(n) => FeatureValue::Numeric(n),
                    None => FeatureValue::Category(raw.to_string()),
                };
                Some((name.clone(), value))
            })
            .collect()
    }

    fn service_level(&self, row: &csv::StringRecord) -> Option<f64> {
        if self.columns.contains_key("service_level") {
            self.number(row, "service_level").map(normalize_service_level)
        } else {
            Some(DEFAULT_SERVICE_LEVEL)
        }
    }
}

/// Loader for past-forecast, past-actual and future-forecast CSV tables
#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    mapping: ColumnMapping,
}

impl CsvLoader {
    /// Create a loader with the given column mapping
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    /// Load historical forecasts
    pub fn past_forecasts<R: Read>(&self, reader: R) -> Result<Vec<PastForecast>> {
        let table = RawTable::read("past_forecast", reader, &self.mapping)?;
        table.require(&["sku_id", "echelon_type", "date", "forecast", "lead_time"])?;

        let mut dropped = 0usize;
        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let (Some(key), Some(date)) = (table.key(row), table.date(row)) else {
                dropped += 1;
                continue;
            };
            // essentials must be present, even if not numeric
            if table.field(row, "forecast").is_none() || table.field(row, "lead_time").is_none() {
                dropped += 1;
                continue;
            }
            records.push(PastForecast {
                key,
                date,
                forecast: table.number(row, "forecast"),
                lead_time: table.number(row, "lead_time"),
                service_level: table.service_level(row),
                attributes: table.attributes(row),
            });
        }

        report_loaded(table.name, records.len(), dropped);
        Ok(records)
    }

    /// Load historical actual sales
    pub fn past_actuals<R: Read>(&self, reader: R) -> Result<Vec<PastActual>> {
        let table = RawTable::read("past_actual", reader, &self.mapping)?;
        table.require(&["sku_id", "echelon_type", "date", "actual"])?;

        let mut dropped = 0usize;
        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let (Some(key), Some(date)) = (table.key(row), table.date(row)) else {
                dropped += 1;
                continue;
            };
            if table.field(row, "actual").is_none() {
                dropped += 1;
                continue;
            }
            records.push(PastActual {
                key,
                date,
                actual: table.number(row, "actual"),
                attributes: table.attributes(row),
            });
        }

        report_loaded(table.name, records.len(), dropped);
        Ok(records)
    }

    /// Load the future forecasts to be scored
    pub fn future_forecasts<R: Read>(&self, reader: R) -> Result<Vec<FutureRecord>> {
        let table = RawTable::read("future_forecast", reader, &self.mapping)?;
        table.require(&["sku_id", "echelon_type", "date", "forecast", "lead_time"])?;

        let mut dropped = 0usize;
        let mut records = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            let (Some(key), Some(date), Some(forecast), Some(lead_time)) = (
                table.key(row),
                table.date(row),
                table.number(row, "forecast"),
                table.number(row, "lead_time"),
            ) else {
                dropped += 1;
                continue;
            };
            records.push(FutureRecord {
                key,
                date,
                forecast,
                lead_time: Some(lead_time),
                service_level: table.service_level(row),
                attributes: table.attributes(row),
            });
        }

        report_loaded(table.name, records.len(), dropped);
        Ok(records)
    }
}

fn report_loaded(table: &str, kept: usize, dropped: usize) {
    if dropped > 0 {
        warn!(table, dropped, "dropped rows missing key, date or essential values");
    }
    info!(table, rows = kept, "loaded table");
}

/// Parse a finite number, `None` otherwise
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a date in one of the accepted layouts; a time component is ignored
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}
