//! Input resolution for merges.
//!
//! Turns the identifiers given on the command line into the ordered,
//! deduplicated list of run result files to consider. A lone directory
//! argument is expanded into the result files it contains; directories mixed
//! with other arguments are passed through untouched.

use crate::error::MergeError;
use crate::merge::fold::input_id;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for input resolution.
#[derive(Debug, Clone)]
pub struct ResolveConfig {
    /// File extensions recognized as run results (e.g. ["json"])
    pub extensions: Vec<String>,
    /// File never picked up by directory expansion (the merge output)
    pub exclude: Option<PathBuf>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["json".to_string()],
            exclude: None,
        }
    }
}

/// Resolves merge inputs into candidate run result files.
pub struct InputResolver {
    config: ResolveConfig,
}

impl InputResolver {
    /// Create a new resolver.
    pub fn new(config: ResolveConfig) -> Self {
        Self { config }
    }

    /// Resolve the given identifiers into candidate files.
    pub fn resolve(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, MergeError> {
        if let [single] = inputs {
            if single.is_dir() {
                return self.expand_dir(single);
            }
        }

        let mut seen = HashSet::new();
        let mut candidates = Vec::with_capacity(inputs.len());

        for input in inputs {
            if !input.exists() {
                return Err(MergeError::InputNotFound {
                    path: input.clone(),
                });
            }
            // Same identity as the merged-input ledger: the path text as given
            if seen.insert(input_id(input)) {
                candidates.push(input.clone());
            } else {
                debug!("Ignoring repeated input {}", input.display());
            }
        }

        Ok(candidates)
    }

    /// Check if a path is a recognized run result file.
    pub fn matches(&self, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.config.extensions.iter().any(|e| e == ext) {
            return false;
        }

        !self.is_excluded(path)
    }

    /// Check if a path is the excluded file.
    fn is_excluded(&self, path: &Path) -> bool {
        let Some(ref exclude) = self.config.exclude else {
            return false;
        };

        // Canonicalize to handle symlinks and relative spellings
        match (fs::canonicalize(path), fs::canonicalize(exclude)) {
            (Ok(a), Ok(b)) => a == b,
            _ => path == exclude.as_path(),
        }
    }

    /// List the result files directly inside `dir`, sorted by name.
    fn expand_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, MergeError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| MergeError::read(dir, e))?;
            let path = entry.into_path();

            if self.matches(&path) {
                files.push(path);
            } else {
                debug!("Skipping {}", path.display());
            }
        }

        files.sort();
        debug!("Expanded {} into {} result files", dir.display(), files.len());
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "{}").unwrap();
        path
    }

    #[test]
    fn test_single_directory_is_expanded_in_sorted_order() {
        let temp_dir = TempDir::new().unwrap();
        let res2 = write(temp_dir.path(), "res2.json");
        let res1 = write(temp_dir.path(), "res1.json");
        write(temp_dir.path(), "notes.txt");
        fs::create_dir(temp_dir.path().join("nested.json")).unwrap();

        let resolver = InputResolver::new(ResolveConfig::default());
        let files = resolver.resolve(&[temp_dir.path().to_path_buf()]).unwrap();

        assert_eq!(files, vec![res1, res2]);
    }

    #[test]
    fn test_directory_mixed_with_files_is_not_expanded() {
        let temp_dir = TempDir::new().unwrap();
        let runs = temp_dir.path().join("runs");
        fs::create_dir(&runs).unwrap();
        write(&runs, "res1.json");
        let extra = write(temp_dir.path(), "extra.json");

        let resolver = InputResolver::new(ResolveConfig::default());
        let files = resolver.resolve(&[runs.clone(), extra.clone()]).unwrap();

        assert_eq!(files, vec![runs, extra]);
    }

    #[test]
    fn test_explicit_files_keep_caller_order_and_drop_repeats() {
        let temp_dir = TempDir::new().unwrap();
        let b = write(temp_dir.path(), "b.json");
        let a = write(temp_dir.path(), "a.json");

        let resolver = InputResolver::new(ResolveConfig::default());
        let files = resolver.resolve(&[b.clone(), a.clone(), b.clone()]).unwrap();

        assert_eq!(files, vec![b, a]);
    }

    #[test]
    fn test_repeats_are_matched_on_path_text() {
        let temp_dir = TempDir::new().unwrap();
        let a = write(temp_dir.path(), "a.json");
        let respelled = PathBuf::from(format!("{}//a.json", temp_dir.path().display()));

        let resolver = InputResolver::new(ResolveConfig::default());
        let files = resolver
            .resolve(&[a.clone(), respelled.clone(), a.clone()])
            .unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(input_id(&files[0]), input_id(&a));
        assert_eq!(input_id(&files[1]), input_id(&respelled));
    }

    #[test]
    fn test_missing_explicit_file_is_input_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let present = write(temp_dir.path(), "a.json");
        let missing = temp_dir.path().join("missing.json");

        let resolver = InputResolver::new(ResolveConfig::default());
        let err = resolver.resolve(&[present, missing.clone()]).unwrap_err();

        match err {
            MergeError::InputNotFound { path } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_directory_expansion_skips_output_file() {
        let temp_dir = TempDir::new().unwrap();
        let res1 = write(temp_dir.path(), "res1.json");
        let merged = write(temp_dir.path(), "merged.json");

        let resolver = InputResolver::new(ResolveConfig {
            exclude: Some(merged),
            ..ResolveConfig::default()
        });
        let files = resolver.resolve(&[temp_dir.path().to_path_buf()]).unwrap();

        assert_eq!(files, vec![res1]);
    }

    #[test]
    fn test_custom_extensions() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "res1.json");
        let run = write(temp_dir.path(), "res2.run");

        let resolver = InputResolver::new(ResolveConfig {
            extensions: vec!["run".to_string()],
            exclude: None,
        });
        let files = resolver.resolve(&[temp_dir.path().to_path_buf()]).unwrap();

        assert_eq!(files, vec![run]);
    }
}
