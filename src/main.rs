//! Lobo - performance result merging and threshold gating
//!
//! A CLI tool that folds per-run timing results into a cumulative
//! dataset and evaluates it against thresholds.
//!
//! Exit codes:
//!   0 - Success (all metrics within thresholds, or nothing to evaluate)
//!   1 - Runtime error (missing input, unreadable file, config, write failure)
//!   2 - Some metric exceeded its threshold

mod cli;
mod config;
mod error;
mod evaluate;
mod merge;
mod models;
mod scanner;
mod store;

use anyhow::{bail, Context, Result};
use cli::{Args, Command};
use config::{Config, DEFAULT_CONFIG_FILE};
use merge::{MergeOptions, MergeOutcome};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Load configuration before logging so `verbose` in the file applies
    let config = match load_config(&args).and_then(|mut config| {
        config.merge_with_args(&args);
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(config.log_level(args.quiet));

    info!("Lobo v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(&args, &config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle init-config: generate a default .lobo.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        bail!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize output paths, thresholds, and concurrency.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the selected command. Returns exit code (0 or 2).
async fn run(args: &Args, config: &Config) -> Result<i32> {
    match args.command {
        Command::Merge(ref merge_args) => {
            run_merge(&merge_args.inputs, config).await?;
            Ok(0)
        }
        Command::Evaluate(ref eval_args) => run_evaluate(&eval_args.file, config),
        Command::Ci(_) => run_ci(config).await,
        Command::InitConfig => {
            handle_init_config()?;
            Ok(0)
        }
    }
}

/// Merge inputs into the configured output and print what happened.
async fn run_merge(inputs: &[PathBuf], config: &Config) -> Result<MergeOutcome> {
    let start_time = Instant::now();
    let options = MergeOptions::from(config);

    println!(
        "🔀 Merging {} into {}",
        describe_inputs(inputs),
        options.output.display()
    );

    let outcome = merge::merge(inputs, &options).await?;
    let duration = start_time.elapsed().as_secs_f64();

    match &outcome {
        MergeOutcome::UpToDate { output, skipped } => {
            println!(
                "   No new inputs ({} already merged). {} left unchanged.",
                skipped,
                output.display()
            );
        }
        MergeOutcome::Merged {
            output,
            new_inputs,
            metrics,
        } => {
            for input in new_inputs {
                debug!("Merged {}", input);
            }
            println!(
                "   Merged {} new input(s) into {} ({} metrics, {:.2}s)",
                new_inputs.len(),
                output.display(),
                metrics,
                duration
            );
        }
    }

    Ok(outcome)
}

/// Evaluate a result file against the configured thresholds.
fn run_evaluate(file: &Path, config: &Config) -> Result<i32> {
    println!(
        "📏 Evaluating {} against {} (statistic: {})",
        file.display(),
        config.evaluate.thresholds.display(),
        config.evaluate.statistic
    );

    let evaluation = evaluate::evaluate(
        file,
        &config.evaluate.thresholds,
        config.evaluate.statistic,
    )?;

    if evaluation.results.is_empty() {
        warn!("{} contains no metrics", file.display());
    } else {
        println!("\n{}", evaluate::format_results_table(&evaluation));
    }

    if evaluation.overall_pass {
        println!("\n✅ All metrics are within thresholds.");
        Ok(0)
    } else {
        let failed: Vec<&str> = evaluation.failures().map(|r| r.name.as_str()).collect();
        eprintln!(
            "\n⛔ Some metrics exceeded thresholds: {}. Failing (exit code 2).",
            failed.join(", ")
        );
        Ok(2)
    }
}

/// Merge the runs directory into the report directory, then evaluate it.
async fn run_ci(config: &Config) -> Result<i32> {
    let runs_dir = config.ci.runs_dir.clone();
    if !runs_dir.is_dir() {
        bail!("Runs directory not found: {}", runs_dir.display());
    }

    let outcome = run_merge(std::slice::from_ref(&runs_dir), config).await?;
    let output = match outcome {
        MergeOutcome::UpToDate { output, .. } | MergeOutcome::Merged { output, .. } => output,
    };

    match merge::load(&output).await? {
        Some(dataset) => {
            println!(
                "\n📊 History: {} runs, {} metrics (last merged {})",
                dataset.inputs.len(),
                dataset.metrics.len(),
                dataset.merged_at
            );
        }
        None => bail!(
            "No result files found in {}; nothing to evaluate",
            runs_dir.display()
        ),
    }

    println!();
    run_evaluate(&output, config)
}

/// Short description of the merge inputs for progress output.
fn describe_inputs(inputs: &[PathBuf]) -> String {
    match inputs {
        [single] => single.display().to_string(),
        _ => format!("{} files", inputs.len()),
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems are reported on stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("Warning: failed to load config, using defaults: {:#}", e);
            Ok(Config::default())
        }
    }
}
