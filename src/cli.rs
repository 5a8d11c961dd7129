//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Statistic;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Lobo - incremental performance result merging and gating
///
/// Folds per-run timing results into one cumulative dataset and checks
/// it against thresholds. Merges are incremental: inputs already merged
/// into the output are skipped.
///
/// Examples:
///   lobo merge profile_runs
///   lobo merge run1.json run2.json -o report/history.json
///   lobo evaluate report/lobo-merged.json -t thresholds.json --statistic max
///   lobo ci --runs-dir profile_runs --report-dir report
///   lobo init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lobo.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Number of result files read concurrently
    #[arg(long, value_name = "NUM", global = true)]
    pub concurrency: Option<usize>,
}

/// Supported subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Merge result files into a cumulative history (incremental if re-run)
    ///
    /// Do not run two merges against the same output at the same time;
    /// concurrent writers can lose updates.
    Merge(MergeArgs),

    /// Evaluate performance against thresholds
    #[command(alias = "eval")]
    Evaluate(EvaluateArgs),

    /// Merge and evaluate in one step (for CI/CD)
    Ci(CiArgs),

    /// Generate a default .lobo.toml configuration file
    InitConfig,
}

/// Arguments of `lobo merge`.
#[derive(clap::Args, Debug, Clone)]
pub struct MergeArgs {
    /// Result files, or a single directory of result files
    #[arg(required = true, value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Output merged JSON file [default: report/lobo-merged.json]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Result file extensions picked up from a directory (comma-separated)
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,
}

/// Arguments of `lobo evaluate`.
#[derive(clap::Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Run result or merged dataset to evaluate
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Thresholds JSON file [default: thresholds.json]
    #[arg(short, long, value_name = "FILE")]
    pub thresholds: Option<PathBuf>,

    /// Statistic of merged series compared against thresholds
    #[arg(long, value_enum, value_name = "STAT")]
    pub statistic: Option<Statistic>,
}

/// Arguments of `lobo ci`.
#[derive(clap::Args, Debug, Clone)]
pub struct CiArgs {
    /// Directory for raw profile run JSON files [default: profile_runs]
    #[arg(short = 'w', long, value_name = "DIR")]
    pub runs_dir: Option<PathBuf>,

    /// Directory for the merged results [default: report]
    #[arg(short, long, value_name = "DIR")]
    pub report_dir: Option<PathBuf>,

    /// Thresholds JSON file [default: thresholds.json]
    #[arg(short, long, value_name = "FILE")]
    pub thresholds: Option<PathBuf>,

    /// Statistic of merged series compared against thresholds
    #[arg(long, value_enum, value_name = "STAT")]
    pub statistic: Option<Statistic>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate concurrency
        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if let Command::Merge(ref merge) = self.command {
            if merge.extensions.as_ref().is_some_and(|e| e.is_empty()) {
                return Err("At least one extension is required".to_string());
            }
        }

        Ok(())
    }
}
