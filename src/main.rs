use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use quickfit_experiment::{
    error_chain, run_pipeline, train_standalone, RunConfig, DEFAULT_OUTPUT_DIR, DEFAULT_TEST_SIZE,
};
use quickfit_model::TaskType;

#[derive(Parser)]
#[command(name = "quickfit")]
#[command(about = "Fit, evaluate, and persist tabular random-forest models from CSV files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for the train/test split of `run`
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Train and evaluate a model, recording results under an experiment directory
    Run {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Name of the target column
        #[arg(long)]
        target: String,

        /// Experiment id, used as the output directory name
        #[arg(long)]
        experiment_id: String,

        /// Task type: "classification", "regression", or "clustering" (detected if omitted)
        #[arg(long)]
        task_type: Option<TaskType>,

        /// Fraction of rows held out for evaluation
        #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
        test_size: f64,

        /// Directory experiment folders are created under
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Model hyperparameter as key=value (repeatable)
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
    },

    /// Train a 100-tree classifier on a CSV whose last column is the label
    Train {
        /// Path to the input CSV file
        #[arg(long)]
        dataset: PathBuf,

        /// Path to write the trained model to
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Run {
            data,
            target,
            experiment_id,
            task_type,
            test_size,
            output_dir,
            params,
        } => {
            let config = RunConfig::new(data, target, experiment_id)
                .with_task_type(task_type)
                .with_test_size(test_size)
                .with_output_dir(output_dir)
                .with_params(params)
                .with_seed(cli.seed);

            let report = run_pipeline(&config);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Train { dataset, output } => match train_standalone(&dataset, &output) {
            Ok(report) => println!("{}", serde_json::to_string(&report)?),
            Err(e) => {
                let output = ErrorOutput {
                    error: error_chain(&e),
                };
                println!("{}", serde_json::to_string(&output)?);
            }
        },
    }

    Ok(())
}
