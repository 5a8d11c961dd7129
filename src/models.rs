//! Data models for run results and merged datasets.
//!
//! These types mirror the JSON documents exchanged with the sample source
//! (one [`RunResult`] per executed run) and with reporting and evaluation
//! (the persisted [`MergedDataset`]). Field names are part of the wire format.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A single timed sample recorded during one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Metric name. May repeat within a run (e.g. a loop body).
    pub name: String,
    /// Duration in milliseconds.
    pub duration: f64,
}

/// The timestamped set of samples produced by one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// ISO-8601 time the run was executed.
    pub timestamp: String,
    /// Samples in recording order. Absent or `null` means none.
    #[serde(rename = "metrics", default, deserialize_with = "null_as_empty")]
    pub samples: Vec<MetricSample>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MetricSample>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::deserialize(deserializer)?.unwrap_or_default())
}

impl RunResult {
    /// Check that every sample carries a usable duration.
    pub fn validate(&self) -> Result<(), String> {
        for sample in &self.samples {
            if !sample.duration.is_finite() || sample.duration < 0.0 {
                return Err(format!(
                    "metric '{}' has invalid duration {}",
                    sample.name, sample.duration
                ));
            }
        }
        Ok(())
    }
}

/// Aggregate statistics of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of samples.
    pub count: usize,
    /// Smallest duration.
    pub min: f64,
    /// Largest duration.
    pub max: f64,
    /// Arithmetic mean of all durations.
    pub avg: f64,
}

impl Statistics {
    /// Returns the value of the selected statistic.
    pub fn value(&self, statistic: Statistic) -> f64 {
        match statistic {
            Statistic::Min => self.min,
            Statistic::Max => self.max,
            Statistic::Avg => self.avg,
        }
    }
}

/// Which aggregate of a merged series is compared against a threshold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Smallest recorded duration
    Min,
    /// Largest recorded duration
    Max,
    /// Mean duration (default)
    #[default]
    Avg,
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Min => write!(f, "min"),
            Statistic::Max => write!(f, "max"),
            Statistic::Avg => write!(f, "avg"),
        }
    }
}

/// Cumulative history of one named metric across all merged runs.
///
/// `durations[i]` was recorded by the run whose timestamp is `timestamps[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// Metric name (unique within a dataset).
    pub name: String,
    /// Every recorded duration, in merge order.
    pub durations: Vec<f64>,
    /// Run timestamp for each entry of `durations`.
    pub timestamps: Vec<String>,
    /// Statistics derived from `durations`.
    pub stats: Statistics,
}

/// The persisted result of one or more merges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDataset {
    /// Time of the last successful merge.
    pub merged_at: String,
    /// Identifiers of every input already incorporated, in merge order.
    pub inputs: Vec<String>,
    /// One series per metric name, in first-seen order.
    pub metrics: Vec<MetricSeries>,
}

impl MergedDataset {
    /// Look up a series by metric name.
    #[cfg(test)]
    pub fn series(&self, name: &str) -> Option<&MetricSeries> {
        self.metrics.iter().find(|s| s.name == name)
    }

    /// Check the structural invariants of a dataset read back from storage.
    pub fn check_consistency(&self) -> Result<(), String> {
        let mut inputs = HashSet::new();
        for input in &self.inputs {
            if !inputs.insert(input.as_str()) {
                return Err(format!("input '{}' is listed more than once", input));
            }
        }

        let mut names = HashSet::new();
        for series in &self.metrics {
            if !names.insert(series.name.as_str()) {
                return Err(format!("metric '{}' appears more than once", series.name));
            }
            if series.durations.is_empty() {
                return Err(format!("metric '{}' has no samples", series.name));
            }
            if series.durations.len() != series.timestamps.len() {
                return Err(format!(
                    "metric '{}' has {} durations but {} timestamps",
                    series.name,
                    series.durations.len(),
                    series.timestamps.len()
                ));
            }
        }

        Ok(())
    }
}
