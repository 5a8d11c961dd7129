//! Incremental folding of run results into metric series.
//!
//! The accumulator is seeded with the series of the prior dataset and then
//! receives each new run in input order. Reads of new inputs overlap, but
//! their samples are applied strictly in the order the inputs were given.

use super::stats;
use crate::error::MergeError;
use crate::models::{MergedDataset, MetricSeries, RunResult};
use crate::store;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Durations and timestamps collected for one metric.
#[derive(Debug, Clone, Default)]
struct SeriesData {
    name: String,
    durations: Vec<f64>,
    timestamps: Vec<String>,
}

/// Ordered collection of metric series keyed by name.
#[derive(Debug, Default)]
pub struct SeriesAccumulator {
    series: Vec<SeriesData>,
    index: HashMap<String, usize>,
}

impl SeriesAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an accumulator holding the series of a prior dataset.
    pub fn from_dataset(dataset: &MergedDataset) -> Self {
        let mut acc = Self::new();
        for series in &dataset.metrics {
            let data = acc.entry(&series.name);
            data.durations.extend_from_slice(&series.durations);
            data.timestamps.extend(series.timestamps.iter().cloned());
        }
        acc
    }

    /// Append every sample of `run`, in sample order.
    pub fn ingest(&mut self, run: &RunResult) {
        for sample in &run.samples {
            let data = self.entry(&sample.name);
            data.durations.push(sample.duration);
            data.timestamps.push(run.timestamp.clone());
        }
    }

    /// Number of distinct metrics.
    pub fn metric_count(&self) -> usize {
        self.series.len()
    }

    /// Finish accumulation, computing fresh statistics for every series.
    pub fn finish(self) -> Result<Vec<MetricSeries>, MergeError> {
        self.series
            .into_iter()
            .map(|data| {
                let stats = stats::compute(&data.name, &data.durations)?;
                Ok(MetricSeries {
                    name: data.name,
                    durations: data.durations,
                    timestamps: data.timestamps,
                    stats,
                })
            })
            .collect()
    }

    fn entry(&mut self, name: &str) -> &mut SeriesData {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                let idx = self.series.len();
                self.series.push(SeriesData {
                    name: name.to_string(),
                    ..SeriesData::default()
                });
                self.index.insert(name.to_string(), idx);
                idx
            }
        };
        &mut self.series[idx]
    }
}

/// Result of folding candidate inputs into a prior dataset.
#[derive(Debug)]
pub enum Fold {
    /// Every candidate was already merged.
    Unchanged,
    /// At least one new input was folded in.
    Updated {
        /// Identifiers of the inputs folded by this call, in order.
        new_inputs: Vec<String>,
        /// All series, prior and new, with recomputed statistics.
        series: Vec<MetricSeries>,
    },
}

/// Identifier under which an input is recorded in a dataset.
pub fn input_id(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Candidates not yet recorded in `prior`, in candidate order.
pub fn new_inputs(prior: Option<&MergedDataset>, candidates: &[PathBuf]) -> Vec<(String, PathBuf)> {
    let merged: HashSet<&str> = prior
        .map(|d| d.inputs.iter().map(String::as_str).collect())
        .unwrap_or_default();

    candidates
        .iter()
        .map(|path| (input_id(path), path.clone()))
        .filter(|(id, _)| !merged.contains(id.as_str()))
        .collect()
}

/// Fold the new inputs among `candidates` into the series of `prior`.
///
/// Up to `concurrency` files are read at once. The first read failure aborts
/// the fold.
pub async fn fold(
    prior: Option<&MergedDataset>,
    candidates: &[PathBuf],
    concurrency: usize,
) -> Result<Fold, MergeError> {
    let pending = new_inputs(prior, candidates);
    if pending.is_empty() {
        return Ok(Fold::Unchanged);
    }

    debug!(
        "{} of {} candidates are new",
        pending.len(),
        candidates.len()
    );

    let mut acc = prior
        .map(SeriesAccumulator::from_dataset)
        .unwrap_or_default();

    {
        // `buffered` yields in submission order regardless of completion order
        let mut runs = stream::iter(pending.iter())
            .map(|(_, path)| store::read_run_result(path))
            .buffered(concurrency.max(1));

        while let Some(run) = runs.try_next().await? {
            acc.ingest(&run);
        }
    }

    debug!("Accumulated {} metric series", acc.metric_count());

    Ok(Fold::Updated {
        new_inputs: pending.into_iter().map(|(id, _)| id).collect(),
        series: acc.finish()?,
    })
}
