//! JSON document storage for run results and merged datasets.
//!
//! Datasets are replaced atomically: the new document is written to a
//! temporary file next to the destination and renamed over it, so readers
//! only ever see the previous complete document or the new one.

use crate::error::MergeError;
use crate::models::{MergedDataset, RunResult};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Read and validate one run result file.
pub async fn read_run_result(path: &Path) -> Result<RunResult, MergeError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MergeError::read(path, e))?;

    let run: RunResult = serde_json::from_str(&content).map_err(|e| MergeError::read(path, e))?;
    run.validate().map_err(|reason| MergeError::read(path, reason))?;

    debug!("Read {} samples from {}", run.samples.len(), path.display());
    Ok(run)
}

/// Read a previously merged dataset.
///
/// Returns `Ok(None)` when nothing has been merged to `path` yet. A parent
/// component that is not a directory also counts as absent; writing there
/// then fails as a persist failure.
pub async fn read_dataset(path: &Path) -> Result<Option<MergedDataset>, MergeError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if is_absent(&e) => return Ok(None),
        Err(e) => return Err(MergeError::read(path, e)),
    };

    let dataset: MergedDataset =
        serde_json::from_str(&content).map_err(|e| MergeError::read(path, e))?;
    dataset
        .check_consistency()
        .map_err(|reason| MergeError::read(path, reason))?;

    Ok(Some(dataset))
}

fn is_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Atomically replace the dataset at `path`, creating parent directories.
pub fn write_dataset(path: &Path, dataset: &MergedDataset) -> Result<(), MergeError> {
    let json = serde_json::to_string_pretty(dataset).map_err(|e| MergeError::persist(path, e))?;

    let parent = parent_dir(path);
    std::fs::create_dir_all(&parent).map_err(|e| MergeError::persist(path, e))?;

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| MergeError::persist(path, e))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| MergeError::persist(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| MergeError::persist(path, e))?;
    tmp.persist(path)
        .map_err(|e| MergeError::persist(path, e.error))?;

    debug!("Wrote {} bytes to {}", json.len(), path.display());
    Ok(())
}

/// Directory that will hold `path`; the current directory for bare file names.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MetricSeries, Statistics};
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_dataset() -> MergedDataset {
        MergedDataset {
            merged_at: "2020-01-03T00:00:00.000Z".to_string(),
            inputs: vec!["res1.json".to_string()],
            metrics: vec![MetricSeries {
                name: "a".to_string(),
                durations: vec![10.0],
                timestamps: vec!["2020-01-01T00:00:00Z".to_string()],
                stats: Statistics {
                    count: 1,
                    min: 10.0,
                    max: 10.0,
                    avg: 10.0,
                },
            }],
        }
    }

    #[tokio::test]
    async fn test_read_missing_dataset_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_dataset(&temp_dir.path().join("merged.json"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_creates_parent_and_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report").join("nested").join("merged.json");

        write_dataset(&path, &sample_dataset()).unwrap();

        let loaded = read_dataset(&path).await.unwrap().unwrap();
        assert_eq!(loaded, sample_dataset());

        // No temporary files are left behind next to the dataset.
        let entries = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn test_written_document_uses_wire_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("merged.json");
        write_dataset(&path, &sample_dataset()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mergedAt"], "2020-01-03T00:00:00.000Z");
        assert_eq!(value["inputs"], json!(["res1.json"]));
        assert_eq!(value["metrics"][0]["name"], "a");
        assert_eq!(value["metrics"][0]["stats"]["count"], 1);
        assert_eq!(
            value["metrics"][0]["timestamps"],
            json!(["2020-01-01T00:00:00Z"])
        );
    }

    #[tokio::test]
    async fn test_dataset_under_a_file_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "plain file").unwrap();

        let result = read_dataset(&blocker.join("merged.json")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_failed_write_is_persist_failure_and_keeps_existing_dataset() {
        let temp_dir = TempDir::new().unwrap();
        let existing = temp_dir.path().join("merged.json");
        write_dataset(&existing, &sample_dataset()).unwrap();
        let before = std::fs::read(&existing).unwrap();

        // The existing dataset sits where a parent directory is needed.
        let target = existing.join("nested.json");
        let err = write_dataset(&target, &sample_dataset()).unwrap_err();

        assert!(matches!(err, MergeError::PersistFailure { ref path, .. } if *path == target));
        assert_eq!(std::fs::read(&existing).unwrap(), before);
        assert_eq!(read_dataset(&existing).await.unwrap(), Some(sample_dataset()));
    }

    #[tokio::test]
    async fn test_corrupt_dataset_is_read_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("merged.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = read_dataset(&path).await.unwrap_err();
        assert!(matches!(err, MergeError::ReadFailure { .. }));
    }

    #[tokio::test]
    async fn test_read_run_result_requires_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("res.json");
        std::fs::write(&path, json!({ "metrics": [] }).to_string()).unwrap();

        let err = read_run_result(&path).await.unwrap_err();
        assert!(matches!(err, MergeError::ReadFailure { .. }));
    }

    #[test]
    fn test_parent_dir_of_bare_file_name() {
        assert_eq!(parent_dir(Path::new("merged.json")), PathBuf::from("."));
        assert_eq!(
            parent_dir(Path::new("report/merged.json")),
            PathBuf::from("report")
        );
    }
}
