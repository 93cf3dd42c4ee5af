//! Demand records shared by the accuracy, segmentation and estimation stages

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of one demand stream: SKU x location x echelon.
///
/// A missing `location_id` denotes an echelon-level series and acts as a
/// wildcard when matched against located series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Stock keeping unit
    pub sku_id: String,
    /// Stocking location, absent for aggregated series
    pub location_id: Option<String>,
    /// Supply-chain stage (e.g. DC, store)
    pub echelon_type: String,
}

impl SeriesKey {
    /// Create a located series key
    pub fn new(sku_id: &str, location_id: &str, echelon_type: &str) -> Self {
        Self {
            sku_id: sku_id.to_string(),
            location_id: Some(location_id.to_string()),
            echelon_type: echelon_type.to_string(),
        }
    }

    /// Create an echelon-level key with no location
    pub fn echelon_level(sku_id: &str, echelon_type: &str) -> Self {
        Self {
            sku_id: sku_id.to_string(),
            location_id: None,
            echelon_type: echelon_type.to_string(),
        }
    }

    /// Whether two keys address the same stream, with a missing location
    /// on either side matching any location.
    pub fn matches(&self, other: &SeriesKey) -> bool {
        self.sku_id == other.sku_id
            && self.echelon_type == other.echelon_type
            && match (&self.location_id, &other.location_id) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.sku_id,
            self.location_id.as_deref().unwrap_or("*"),
            self.echelon_type
        )
    }
}

/// Value of a contextual attribute carried alongside a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Numeric(f64),
    Category(String),
}

/// Named contextual attributes (promotion flags, region, weather, ...)
pub type Attributes = BTreeMap<String, FeatureValue>;

/// One historical observation with both forecast and actual demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub key: SeriesKey,
    pub date: NaiveDate,
    /// Forecast quantity; `None` when the source value was not numeric
    pub forecast: Option<f64>,
    /// Actual demand; `None` when the source value was not numeric
    pub actual: Option<f64>,
    pub lead_time: Option<f64>,
    pub service_level: Option<f64>,
    #[serde(default)]
    pub attributes: Attributes,
}

impl HistoryRecord {
    /// The `(forecast, actual)` pair when both are finite numbers
    pub fn valid_pair(&self) -> Option<(f64, f64)> {
        match (self.forecast, self.actual) {
            (Some(f), Some(a)) if f.is_finite() && a.is_finite() => Some((f, a)),
            _ => None,
        }
    }
}

/// One future forecast row to be scored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureRecord {
    pub key: SeriesKey,
    pub date: NaiveDate,
    pub forecast: f64,
    pub lead_time: Option<f64>,
    /// Target probability of not stocking out, on the 0-1 scale
    pub service_level: Option<f64>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// A historical forecast row before alignment with actuals
#[derive(Debug, Clone, PartialEq)]
pub struct PastForecast {
    pub key: SeriesKey,
    pub date: NaiveDate,
    pub forecast: Option<f64>,
    pub lead_time: Option<f64>,
    pub service_level: Option<f64>,
    pub attributes: Attributes,
}

/// A historical actual-sales row before alignment with forecasts
#[derive(Debug, Clone, PartialEq)]
pub struct PastActual {
    pub key: SeriesKey,
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_location_is_wildcard() {
        let located = SeriesKey::new("SKU1", "LOC1", "DC");
        let other_loc = SeriesKey::new("SKU1", "LOC2", "DC");
        let echelon = SeriesKey::echelon_level("SKU1", "DC");

        assert!(located.matches(&echelon));
        assert!(echelon.matches(&other_loc));
        assert!(!located.matches(&other_loc));
        assert!(!located.matches(&SeriesKey::new("SKU1", "LOC1", "Store")));
    }

    #[test]
    fn test_display() {
        assert_eq!(SeriesKey::new("A", "L", "DC").to_string(), "A/L/DC");
        assert_eq!(SeriesKey::echelon_level("A", "DC").to_string(), "A/*/DC");
    }
}
