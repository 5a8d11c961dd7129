//! Error types for the merge engine.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons a merge can fail.
///
/// Every variant aborts the merge before anything is persisted.
#[derive(Debug, Error)]
pub enum MergeError {
    /// An explicitly named input does not exist.
    #[error("Input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// An input exists but could not be read or parsed.
    #[error("Failed to read {}: {reason}", path.display())]
    ReadFailure { path: PathBuf, reason: String },

    /// Statistics were requested for a series without samples.
    #[error("Cannot compute statistics for empty series '{name}'")]
    EmptySeries { name: String },

    /// The merged dataset could not be written.
    #[error("Failed to write merged dataset to {}: {reason}", path.display())]
    PersistFailure { path: PathBuf, reason: String },
}

impl MergeError {
    pub(crate) fn read(path: &Path, reason: impl ToString) -> Self {
        Self::ReadFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn persist(path: &Path, reason: impl ToString) -> Self {
        Self::PersistFailure {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_path() {
        let err = MergeError::InputNotFound {
            path: PathBuf::from("runs/res1.json"),
        };
        assert_eq!(err.to_string(), "Input not found: runs/res1.json");

        let err = MergeError::read(Path::new("res2.json"), "expected value at line 1");
        assert!(err.to_string().contains("res2.json"));
        assert!(err.to_string().contains("expected value"));
    }
}
