//! Result merger and method selector
//!
//! The selector runs the estimators a [`RunConfig`] asks for and left-joins
//! each result, as its own named column, onto the future forecast table by
//! `(sku_id, location_id, echelon_type, date)`. The output always has exactly
//! one row per future forecast row; estimator columns are `None` where an
//! estimator produced nothing for a row.

use crate::config::{MethodChoice, RunConfig};
use crate::estimators::bayesian::bayesian_table;
use crate::estimators::error_based::{mae_safety_stock, rmse_safety_stock};
use crate::estimators::hybrid::hybrid_safety_stock;
use crate::estimators::ml_based::ml_based_table;
use crate::estimators::rule_based::rule_based_table;
use crate::estimators::{required_lead_time, required_service_level, HistoryIndex, KeyedEstimate};
use crate::{Result, SafetyStockError};
use chrono::NaiveDate;
use forecast_accuracy::{
    FutureRecord, HistoryRecord, MethodAssignment, SegmentationOutcome, SelectedMethod, SeriesKey,
};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

/// Named estimate column of a merged table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EstimateColumn {
    RuleSs,
    RmseSs,
    RmseVarSs,
    MaeSs,
    MaeVarSs,
    HybridSs,
    HybridVarSs,
    MlSs,
    BayesianSs,
    FinalSs,
}

impl EstimateColumn {
    pub fn name(&self) -> &'static str {
        match self {
            EstimateColumn::RuleSs => "rule_ss",
            EstimateColumn::RmseSs => "rmse_ss",
            EstimateColumn::RmseVarSs => "rmse_var_ss",
            EstimateColumn::MaeSs => "mae_ss",
            EstimateColumn::MaeVarSs => "mae_var_ss",
            EstimateColumn::HybridSs => "hybrid_ss",
            EstimateColumn::HybridVarSs => "hybrid_var_ss",
            EstimateColumn::MlSs => "ml_ss",
            EstimateColumn::BayesianSs => "bayesian_ss",
            EstimateColumn::FinalSs => "final_ss",
        }
    }
}

impl fmt::Display for EstimateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A future forecast row with its estimate columns
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub future: FutureRecord,
    /// One entry per column of the owning table
    pub values: Vec<Option<f64>>,
    /// Segmentation decision, set in segmented runs
    pub selected_method: Option<SelectedMethod>,
}

/// Future forecast table with estimate columns joined on
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergedTable {
    columns: Vec<EstimateColumn>,
    rows: Vec<MergedRow>,
}

impl MergedTable {
    /// Table with no estimate columns, one row per future forecast row
    pub fn from_future(future: &[FutureRecord]) -> Self {
        Self {
            columns: Vec::new(),
            rows: future
                .iter()
                .map(|row| MergedRow {
                    future: row.clone(),
                    values: Vec::new(),
                    selected_method: None,
                })
                .collect(),
        }
    }

    pub fn columns(&self) -> &[EstimateColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[MergedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: EstimateColumn) -> bool {
        self.column_index(column).is_some()
    }

    fn column_index(&self, column: EstimateColumn) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// Value of `column` in row `row`; `None` if either is absent or the
    /// value is null
    pub fn value(&self, row: usize, column: EstimateColumn) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.values[idx])
    }

    /// Whole column, `None` if the table does not have it
    pub fn column_values(&self, column: EstimateColumn) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }

    /// Left-join `estimates` as `column` by series key and date.
    ///
    /// A column already present is left untouched, and when several estimates
    /// share a key the first one wins.
    pub fn left_join(&mut self, column: EstimateColumn, estimates: &[KeyedEstimate]) {
        if self.has_column(column) {
            debug!(%column, "column already present, keeping first occurrence");
            return;
        }

        let mut lookup: HashMap<(&SeriesKey, NaiveDate), f64> = HashMap::new();
        for estimate in estimates {
            lookup
                .entry((&estimate.key, estimate.date))
                .or_insert(estimate.value);
        }

        let mut matched = 0usize;
        for row in &mut self.rows {
            let value = lookup.get(&(&row.future.key, row.future.date)).copied();
            matched += usize::from(value.is_some());
            row.values.push(value);
        }
        self.columns.push(column);

        debug!(%column, rows = self.rows.len(), matched, "joined estimate column");
    }

    /// Add `final_ss` as a copy of `source`
    fn copy_to_final(&mut self, source: EstimateColumn) {
        let values: Vec<Option<f64>> = match self.column_values(source) {
            Some(values) => values,
            None => vec![None; self.rows.len()],
        };
        self.push_final(values);
    }

    fn push_final(&mut self, values: Vec<Option<f64>>) {
        if self.has_column(EstimateColumn::FinalSs) {
            return;
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.values.push(value);
        }
        self.columns.push(EstimateColumn::FinalSs);
    }
}

/// Run the estimators selected by `config` and merge their results onto the
/// future forecast table.
///
/// Without past data only the rule-based forecast proxy runs. With past data:
///
/// - `ml-only`: `ml_ss`, copied to `final_ss`
/// - `rule-only`: `rule_ss`, copied to `final_ss`
/// - `both`: `ml_ss`, `rule_ss` and, when enabled, `bayesian_ss`
/// - `segmented`: rule, error-based and hybrid columns, with `final_ss` taken
///   from the column the series' segmentation selected
pub fn run_safety_stock_selector(
    config: &RunConfig,
    future: &[FutureRecord],
    history: Option<&[HistoryRecord]>,
    segmentation: &SegmentationOutcome,
) -> Result<MergedTable> {
    let mut table = MergedTable::from_future(future);
    if future.is_empty() {
        info!("no future forecast rows, nothing to estimate");
        return Ok(table);
    }

    let history = match (config.has_past_data(), history) {
        (false, _) => None,
        (true, Some(h)) if !h.is_empty() => Some(h),
        (true, _) => {
            return Err(SafetyStockError::Configuration(
                "Past data flagged as available but no historical records were supplied"
                    .to_string(),
            ))
        }
    };

    let Some(history) = history else {
        info!(rows = future.len(), "no past data, rule-based scoring of future forecasts");
        table.left_join(EstimateColumn::RuleSs, &rule_based_table(future, None)?);
        table.copy_to_final(EstimateColumn::RuleSs);
        return Ok(table);
    };

    let index = HistoryIndex::new(history);
    info!(
        rows = future.len(),
        history_series = index.series_count(),
        method = %config.method_choice,
        "running safety stock selector"
    );

    match config.method_choice {
        MethodChoice::MlOnly => {
            let ml = ml_based_table(history, future, &config.ml, config.parallel)?;
            table.left_join(EstimateColumn::MlSs, &ml);
            table.copy_to_final(EstimateColumn::MlSs);
        }
        MethodChoice::RuleOnly => {
            table.left_join(EstimateColumn::RuleSs, &rule_based_table(future, Some(&index))?);
            table.copy_to_final(EstimateColumn::RuleSs);
        }
        MethodChoice::Both => {
            let ml = ml_based_table(history, future, &config.ml, config.parallel)?;
            table.left_join(EstimateColumn::MlSs, &ml);
            table.left_join(EstimateColumn::RuleSs, &rule_based_table(future, Some(&index))?);
            if config.include_bayesian {
                let bayesian = bayesian_table(history, future, &config.bayesian, config.parallel)?;
                table.left_join(EstimateColumn::BayesianSs, &bayesian);
            }
        }
        MethodChoice::Segmented => {
            table.left_join(EstimateColumn::RuleSs, &rule_based_table(future, Some(&index))?);
            for (column, estimates) in error_and_hybrid_columns(future, &index)? {
                table.left_join(column, &estimates);
            }
            apply_segmentation(&mut table, segmentation.assignments().unwrap_or(&[]));
        }
    }

    Ok(table)
}

/// RMSE, MAE and hybrid estimates for every future row with history
fn error_and_hybrid_columns(
    future: &[FutureRecord],
    index: &HistoryIndex,
) -> Result<Vec<(EstimateColumn, Vec<KeyedEstimate>)>> {
    let mut columns: Vec<(EstimateColumn, Vec<KeyedEstimate>)> = [
        EstimateColumn::RmseSs,
        EstimateColumn::RmseVarSs,
        EstimateColumn::MaeSs,
        EstimateColumn::MaeVarSs,
        EstimateColumn::HybridSs,
        EstimateColumn::HybridVarSs,
    ]
    .into_iter()
    .map(|c| (c, Vec::new()))
    .collect();

    for row in future {
        let series = index.series(&row.key);
        if series.is_empty() {
            continue;
        }
        let lead_time = required_lead_time(row)?;
        let service_level = required_service_level(row)?;

        let rmse = rmse_safety_stock(&series, lead_time, service_level)?;
        let mae = mae_safety_stock(&series, lead_time, service_level)?;
        let hybrid = hybrid_safety_stock(&series, lead_time, service_level)?;

        let values = [
            Some(rmse.no_var),
            rmse.with_var,
            Some(mae.no_var),
            mae.with_var,
            Some(hybrid.no_var),
            hybrid.with_var,
        ];
        for ((_, estimates), value) in columns.iter_mut().zip(values) {
            if let Some(value) = value {
                estimates.push(KeyedEstimate {
                    key: row.key.clone(),
                    date: row.date,
                    value,
                });
            }
        }
    }

    Ok(columns)
}

/// Column holding the estimate for a selected method
fn column_for(method: SelectedMethod) -> EstimateColumn {
    match method {
        SelectedMethod::ForecastBased => EstimateColumn::RmseSs,
        SelectedMethod::Hybrid => EstimateColumn::HybridSs,
        SelectedMethod::RuleBased => EstimateColumn::RuleSs,
    }
}

/// Set `selected_method` and `final_ss` per row. Rows without an assignment,
/// or whose selected column is null, fall back to `rule_ss`.
///
/// Assignments are echelon-level, so every location of a SKU x echelon shares
/// one method. The first assignment for a pair wins.
fn apply_segmentation(table: &mut MergedTable, assignments: &[MethodAssignment]) {
    let mut by_echelon: HashMap<(&str, &str), SelectedMethod> =
        HashMap::with_capacity(assignments.len());
    for assignment in assignments {
        let key = &assignment.metrics.key;
        by_echelon
            .entry((key.sku_id.as_str(), key.echelon_type.as_str()))
            .or_insert(assignment.selected_method);
    }

    let mut finals = Vec::with_capacity(table.len());
    for i in 0..table.len() {
        let key = &table.rows[i].future.key;
        let method = by_echelon
            .get(&(key.sku_id.as_str(), key.echelon_type.as_str()))
            .copied();

        let selected = method.and_then(|m| table.value(i, column_for(m)));
        finals.push(selected.or_else(|| table.value(i, EstimateColumn::RuleSs)));
        table.rows[i].selected_method = method;
    }
    table.push_final(finals);
}
