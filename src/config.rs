//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lobo.toml` files.

use crate::cli::{Args, Command};
use crate::models::Statistic;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".lobo.toml";

/// File name of the merged dataset inside the ci report directory.
pub const MERGED_FILE_NAME: &str = "lobo-merged.json";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Merge settings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// Threshold evaluation settings.
    #[serde(default)]
    pub evaluate: EvaluateConfig,

    /// CI pipeline settings.
    #[serde(default)]
    pub ci: CiConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of result files read concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Merged dataset path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Extensions of result files picked up from a directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            extensions: default_extensions(),
        }
    }
}

fn default_output() -> PathBuf {
    Path::new("report").join(MERGED_FILE_NAME)
}

fn default_extensions() -> Vec<String> {
    vec!["json".to_string()]
}

/// Threshold evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateConfig {
    /// Thresholds file path.
    #[serde(default = "default_thresholds")]
    pub thresholds: PathBuf,

    /// Statistic of a merged series compared against its threshold.
    #[serde(default)]
    pub statistic: Statistic,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            thresholds: default_thresholds(),
            statistic: Statistic::default(),
        }
    }
}

fn default_thresholds() -> PathBuf {
    PathBuf::from("thresholds.json")
}

/// CI pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiConfig {
    /// Directory holding raw run result files.
    #[serde(default = "default_runs_dir")]
    pub runs_dir: PathBuf,

    /// Directory receiving the merged dataset.
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
}

impl Default for CiConfig {
    fn default() -> Self {
        Self {
            runs_dir: default_runs_dir(),
            report_dir: default_report_dir(),
        }
    }
}

fn default_runs_dir() -> PathBuf {
    PathBuf::from("profile_runs")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("report")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line override.
    pub fn merge_with_args(&mut self, args: &Args) {
        if args.verbose {
            self.general.verbose = true;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        match &args.command {
            Command::Merge(merge) => {
                if let Some(ref output) = merge.output {
                    self.merge.output = output.clone();
                }
                if let Some(ref extensions) = merge.extensions {
                    self.merge.extensions = extensions.clone();
                }
            }
            Command::Evaluate(eval) => {
                if let Some(ref thresholds) = eval.thresholds {
                    self.evaluate.thresholds = thresholds.clone();
                }
                if let Some(statistic) = eval.statistic {
                    self.evaluate.statistic = statistic;
                }
            }
            Command::Ci(ci) => {
                if let Some(ref runs_dir) = ci.runs_dir {
                    self.ci.runs_dir = runs_dir.clone();
                }
                if let Some(ref report_dir) = ci.report_dir {
                    self.ci.report_dir = report_dir.clone();
                }
                if let Some(ref thresholds) = ci.thresholds {
                    self.evaluate.thresholds = thresholds.clone();
                }
                if let Some(statistic) = ci.statistic {
                    self.evaluate.statistic = statistic;
                }
                // The ci pipeline always merges into its report directory
                self.merge.output = self.ci.report_dir.join(MERGED_FILE_NAME);
            }
            Command::InitConfig => {}
        }
    }

    /// Log level for the merged settings. `--quiet` wins over `verbose`.
    pub fn log_level(&self, quiet: bool) -> tracing::Level {
        if quiet {
            tracing::Level::ERROR
        } else if self.general.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Reject settings the merge engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.general.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }
        if self.merge.extensions.is_empty() {
            bail!("At least one result file extension is required");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.general.verbose);
        assert_eq!(config.general.concurrency, 4);
        assert_eq!(config.merge.output, PathBuf::from("report/lobo-merged.json"));
        assert_eq!(config.merge.extensions, vec!["json"]);
        assert_eq!(config.evaluate.statistic, Statistic::Avg);
        assert_eq!(config.ci.runs_dir, PathBuf::from("profile_runs"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
verbose = true
concurrency = 8

[merge]
output = "out/history.json"

[evaluate]
thresholds = "ci/limits.json"
statistic = "max"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert!(config.general.verbose);
        assert_eq!(config.general.concurrency, 8);
        assert_eq!(config.merge.output, PathBuf::from("out/history.json"));
        assert_eq!(config.merge.extensions, vec!["json"]);
        assert_eq!(config.evaluate.thresholds, PathBuf::from("ci/limits.json"));
        assert_eq!(config.evaluate.statistic, Statistic::Max);
        assert_eq!(config.ci.report_dir, PathBuf::from("report"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        let args = Args::try_parse_from([
            "lobo",
            "--concurrency",
            "2",
            "merge",
            "runs",
            "-o",
            "custom.json",
        ])
        .unwrap();

        config.merge_with_args(&args);
        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.merge.output, PathBuf::from("custom.json"));
        assert_eq!(config.merge.extensions, vec!["json"]);
    }

    #[test]
    fn test_ci_merges_into_report_dir() {
        let mut config = Config::default();
        let args = Args::try_parse_from(["lobo", "ci", "-r", "artifacts", "-t", "limits.json"])
            .unwrap();

        config.merge_with_args(&args);
        assert_eq!(
            config.merge.output,
            PathBuf::from("artifacts").join("lobo-merged.json")
        );
        assert_eq!(config.evaluate.thresholds, PathBuf::from("limits.json"));
    }

    #[test]
    fn test_verbose_from_file_or_flag() {
        let mut config = Config::default();
        let args = Args::try_parse_from(["lobo", "merge", "runs"]).unwrap();
        config.merge_with_args(&args);
        assert_eq!(config.log_level(false), tracing::Level::INFO);

        config.general.verbose = true;
        config.merge_with_args(&args);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
        assert_eq!(config.log_level(true), tracing::Level::ERROR);

        let mut config = Config::default();
        let args = Args::try_parse_from(["lobo", "-v", "merge", "runs"]).unwrap();
        config.merge_with_args(&args);
        assert!(config.general.verbose);
        assert_eq!(config.log_level(false), tracing::Level::DEBUG);
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = Config::default();
        config.general.concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[merge]"));
        assert!(toml_str.contains("[evaluate]"));
        assert!(toml_str.contains("[ci]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.merge.output, Config::default().merge.output);
    }
}
