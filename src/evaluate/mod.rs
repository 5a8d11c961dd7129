//! Threshold evaluation.
//!
//! Compares a run result (per-sample `duration`) or a merged dataset
//! (per-series `stats`) against a thresholds file mapping metric names to a
//! maximum allowed value in milliseconds.

use crate::models::{Statistic, Statistics};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Outcome for a single metric entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedMetric {
    pub name: String,
    /// Measured value, `None` when the entry carries neither a duration nor stats.
    pub value: Option<f64>,
    pub threshold: Option<f64>,
    pub pass: bool,
}

/// Outcome of evaluating a whole document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub overall_pass: bool,
    pub results: Vec<EvaluatedMetric>,
}

impl Evaluation {
    /// Results that exceeded their threshold.
    pub fn failures(&self) -> impl Iterator<Item = &EvaluatedMetric> {
        self.results.iter().filter(|r| !r.pass)
    }
}

/// Load a thresholds file. Entries whose value is not a number are ignored.
pub fn load_thresholds(path: &Path) -> Result<HashMap<String, f64>> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| anyhow!("Threshold file not found: {}", path.display()))?;
    let raw: HashMap<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse threshold file: {}", path.display()))?;

    let thresholds = raw
        .into_iter()
        .filter_map(|(name, value)| match value.as_f64() {
            Some(limit) => Some((name, limit)),
            None => {
                warn!("Ignoring non-numeric threshold for '{}'", name);
                None
            }
        })
        .collect();

    Ok(thresholds)
}

/// Evaluate the result file at `input` against the thresholds at `thresholds`.
pub fn evaluate(input: &Path, thresholds: &Path, statistic: Statistic) -> Result<Evaluation> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read result file: {}", input.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse result file: {}", input.display()))?;

    let thresholds = load_thresholds(thresholds)?;
    debug!("Loaded {} thresholds", thresholds.len());

    Ok(evaluate_document(&document, &thresholds, statistic))
}

/// Evaluate an already parsed document.
pub fn evaluate_document(
    document: &Value,
    thresholds: &HashMap<String, f64>,
    statistic: Statistic,
) -> Evaluation {
    let entries = document
        .get("metrics")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let results: Vec<EvaluatedMetric> = entries
        .iter()
        .filter_map(|entry| {
            let Some(name) = entry.get("name").and_then(Value::as_str) else {
                warn!("Skipping metric entry without a name");
                return None;
            };
            let value = metric_value(entry, statistic);
            let threshold = thresholds.get(name).copied();
            let pass = match (threshold, value) {
                (None, _) => true,
                (Some(limit), Some(value)) => value <= limit,
                (Some(_), None) => false,
            };

            Some(EvaluatedMetric {
                name: name.to_string(),
                value,
                threshold,
                pass,
            })
        })
        .collect();

    Evaluation {
        overall_pass: results.iter().all(|r| r.pass),
        results,
    }
}

/// Value compared for one entry: its `duration`, or the chosen statistic.
fn metric_value(entry: &Value, statistic: Statistic) -> Option<f64> {
    if let Some(duration) = entry.get("duration").and_then(Value::as_f64) {
        return Some(duration);
    }

    let stats: Statistics = serde_json::from_value(entry.get("stats")?.clone()).ok()?;
    Some(stats.value(statistic))
}

/// Render results as an aligned plain-text table.
pub fn format_results_table(evaluation: &Evaluation) -> String {
    let width = evaluation
        .results
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("Metric".len());

    let mut lines = Vec::with_capacity(evaluation.results.len() + 1);
    lines.push(format!(
        "   {:<width$}  {:>12}  {:>12}  Status",
        "Metric", "Value (ms)", "Threshold"
    ));

    for result in &evaluation.results {
        let value = result
            .value
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "-".to_string());
        let threshold = result
            .threshold
            .map(|t| format!("{:.2}", t))
            .unwrap_or_else(|| "-".to_string());
        let status = if result.pass { "✅ pass" } else { "❌ FAIL" };

        lines.push(format!(
            "   {:<width$}  {:>12}  {:>12}  {}",
            result.name, value, threshold, status
        ));
    }

    lines.join("\n")
}
