//! Incremental merging of run results into a cumulative dataset.
//!
//! A merge resolves its inputs, loads the dataset already stored at the
//! output path, folds in only the inputs that dataset has not seen, and
//! atomically writes the result. Re-running a merge with inputs that were
//! already merged leaves the output untouched.
//!
//! Merges targeting the same output must not run concurrently; the engine
//! does no cross-process locking and a concurrent writer can lose updates.

pub mod fold;
pub mod stats;

pub use fold::Fold;

use crate::error::MergeError;
use crate::models::{MergedDataset, MetricSeries};
use crate::scanner::{InputResolver, ResolveConfig};
use crate::store;
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Settings for a merge.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Location of the merged dataset.
    pub output: PathBuf,
    /// File extensions recognized when expanding a directory.
    pub extensions: Vec<String>,
    /// Maximum number of input files read at once.
    pub concurrency: usize,
}

impl From<&crate::config::Config> for MergeOptions {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            output: config.merge.output.clone(),
            extensions: config.merge.extensions.clone(),
            concurrency: config.general.concurrency,
        }
    }
}

/// What a merge did.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Nothing new to merge; the output was not touched.
    UpToDate {
        /// Location of the dataset.
        output: PathBuf,
        /// Number of candidate inputs that were already merged.
        skipped: usize,
    },
    /// New inputs were merged and the output rewritten.
    Merged {
        /// Location of the dataset.
        output: PathBuf,
        /// Inputs folded by this merge.
        new_inputs: Vec<String>,
        /// Total number of metric series in the dataset.
        metrics: usize,
    },
}

/// Merge `inputs` into the dataset at `options.output`.
pub async fn merge(inputs: &[PathBuf], options: &MergeOptions) -> Result<MergeOutcome, MergeError> {
    let resolver = InputResolver::new(ResolveConfig {
        extensions: options.extensions.clone(),
        exclude: Some(options.output.clone()),
    });
    let candidates = resolver.resolve(inputs)?;
    debug!("Resolved {} candidate inputs", candidates.len());

    let prior = store::read_dataset(&options.output).await?;
    if let Some(ref dataset) = prior {
        debug!(
            "Loaded prior dataset with {} inputs and {} metrics",
            dataset.inputs.len(),
            dataset.metrics.len()
        );
    }

    let folded = fold::fold(prior.as_ref(), &candidates, options.concurrency).await?;
    let (new_inputs, series) = match folded {
        Fold::Unchanged => {
            info!("No new inputs to merge into {}", options.output.display());
            return Ok(MergeOutcome::UpToDate {
                output: options.output.clone(),
                skipped: candidates.len(),
            });
        }
        Fold::Updated { new_inputs, series } => (new_inputs, series),
    };

    let dataset = assemble(prior, new_inputs.clone(), series, now());
    store::write_dataset(&options.output, &dataset)?;

    info!(
        "Merged {} new inputs into {} ({} metrics)",
        new_inputs.len(),
        options.output.display(),
        dataset.metrics.len()
    );

    Ok(MergeOutcome::Merged {
        output: options.output.clone(),
        new_inputs,
        metrics: dataset.metrics.len(),
    })
}

/// Build the next dataset from the prior one and the folded series.
pub fn assemble(
    prior: Option<MergedDataset>,
    new_inputs: Vec<String>,
    series: Vec<MetricSeries>,
    merged_at: String,
) -> MergedDataset {
    let mut inputs = prior.map(|d| d.inputs).unwrap_or_default();
    inputs.extend(new_inputs);

    MergedDataset {
        merged_at,
        inputs,
        metrics: series,
    }
}

/// Current time in the format used for `mergedAt`.
fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read the merged dataset stored at `path`, if any.
pub async fn load(path: &Path) -> Result<Option<MergedDataset>, MergeError> {
    store::read_dataset(path).await
}
