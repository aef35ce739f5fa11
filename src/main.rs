// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS channel tomography CLI
//!
//! Generates a ground-truth channel and synthetic measurement data, then
//! reconstructs the channel by Riemannian optimization.
//!
//! # Usage
//!
//! ```bash
//! # Reconstruct with default configuration
//! qubit-os-tomo run
//!
//! # One qubit, identity channel, exact probabilities
//! qubit-os-tomo run --qubits 1 --rank 1 --ground-truth identity --noiseless
//!
//! # Save the session and continue it later
//! qubit-os-tomo run --iterations 200 --checkpoint session.json
//! qubit-os-tomo run --iterations 400 --resume session.json
//!
//! # Show effective configuration
//! qubit-os-tomo config --config /path/to/config.yaml
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use qubit_os_tomography::checkpoint::Checkpoint;
use qubit_os_tomography::optimizer::OptimizerKind;
use qubit_os_tomography::tomography::{GroundTruthKind, TomographyResult, TomographySession};
use qubit_os_tomography::{config::Config, Result, VERSION};

/// QubitOS quantum channel tomography
#[derive(Parser)]
#[command(name = "qubit-os-tomo")]
#[command(author = "QubitOS Contributors")]
#[command(version = VERSION)]
#[command(about = "Quantum channel tomography on the manifold of Choi matrices")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "QUBITOS_TOMO_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate data and reconstruct the channel
    Run {
        /// Number of qubits
        #[arg(long)]
        qubits: Option<usize>,

        /// Kraus-rank budget of the estimate
        #[arg(long)]
        rank: Option<usize>,

        /// Measurement shots (input states with --noiseless)
        #[arg(long)]
        samples: Option<usize>,

        /// Optimizer iterations
        #[arg(long)]
        iterations: Option<usize>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Optimizer
        #[arg(long, value_parser = ["radam", "rsgd"])]
        optimizer: Option<String>,

        /// Ground-truth channel
        #[arg(long, value_parser = ["random", "identity"])]
        ground_truth: Option<String>,

        /// Weight every outcome by its exact probability instead of sampling
        #[arg(long)]
        noiseless: bool,

        /// Stop once the distance to the ground truth drops below this value
        #[arg(long)]
        target_distance: Option<f64>,

        /// Write a checkpoint here when the run ends
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Continue from this checkpoint
        #[arg(long)]
        resume: Option<PathBuf>,

        /// Write the loss and distance histories here as JSON
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Show effective configuration
    Config,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    init_logging(&config.logging.level, &config.logging.format);

    match cli.command {
        Commands::Run {
            qubits,
            rank,
            samples,
            iterations,
            seed,
            learning_rate,
            optimizer,
            ground_truth,
            noiseless,
            target_distance,
            checkpoint,
            resume,
            history,
        } => {
            // Override config with CLI args
            let t = &mut config.tomography;
            if let Some(v) = qubits {
                t.num_qubits = v;
            }
            if let Some(v) = rank {
                t.kraus_rank = v;
            }
            if let Some(v) = samples {
                t.num_samples = v;
            }
            if let Some(v) = iterations {
                t.num_iterations = v;
            }
            if let Some(v) = seed {
                t.seed = v;
            }
            if noiseless {
                t.noiseless = true;
            }
            if target_distance.is_some() {
                t.target_distance = target_distance;
            }
            match ground_truth.as_deref() {
                Some("identity") => t.ground_truth = GroundTruthKind::Identity,
                Some("random") => t.ground_truth = GroundTruthKind::Random,
                _ => {}
            }
            if let Some(v) = learning_rate {
                config.optimizer.learning_rate = v;
            }
            match optimizer.as_deref() {
                Some("radam") => config.optimizer.kind = OptimizerKind::RAdam,
                Some("rsgd") => config.optimizer.kind = OptimizerKind::RSgd,
                _ => {}
            }

            config.validate()?;

            let mut session = match resume {
                Some(path) => {
                    let saved = Checkpoint::load(&path)?;
                    TomographySession::from_checkpoint(&config.tomography, &config.optimizer, saved)?
                        .with_validation(&config.validation)
                }
                None => TomographySession::from_config(
                    &config.tomography,
                    &config.optimizer,
                    &config.validation,
                )?,
            };

            info!(version = VERSION, seed = config.tomography.seed, "QubitOS channel tomography");
            let result = session.run()?;

            if let Some(path) = checkpoint {
                session.checkpoint().save(&path)?;
            }
            if let Some(path) = history {
                write_history(&path, &result)?;
            }
            print_summary(&result);
        }

        Commands::Config => {
            println!("{}", serde_yaml::to_string(&config)?);
        }

        Commands::Validate => match config.validate() {
            Ok(()) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

/// Initialize logging with tracing. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn write_history(path: &Path, result: &TomographyResult) -> Result<()> {
    let history = serde_json::json!({
        "iterations": result.iterations,
        "state": result.state,
        "loss": result.loss_history,
        "distance": result.distance_history,
    });
    std::fs::write(path, serde_json::to_string_pretty(&history)?)?;
    Ok(())
}

fn print_summary(result: &TomographyResult) {
    println!("state:      {:?}", result.state);
    println!("iterations: {}", result.iterations);
    if let Some(loss) = result.final_loss() {
        println!("final loss: {:.6}", loss);
    }
    match result.final_distance() {
        Some(j) => println!("distance J: {:.6}", j),
        None => println!("distance J: (not tracked)"),
    }
}
