//! # devsim-cli::args
//!
//! Defines the command-line argument structure using `clap`.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, default_value = "human")]
    pub log: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation from an experiment file.
    Run(RunOpts),
    /// Validate an experiment file for correctness.
    Validate {
        #[arg(value_name = "EXPERIMENT_PATH")]
        experiment: PathBuf,
    },
    /// List all compiled and available dynamics.
    ListDynamics,
}

#[derive(Args, Debug)]
pub struct RunOpts {
    /// Path to the experiment file (YAML or TOML).
    #[arg(short, long)]
    pub experiment: PathBuf,

    /// Override the RNG seed from the experiment file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the simulation horizon from the experiment file.
    #[arg(long)]
    pub horizon: Option<f64>,

    /// Abort if more than this many bags pile up at one instant
    /// (zero-delay cascade guard).
    #[arg(long)]
    pub cycle_limit: Option<u64>,

    /// Only log warnings and errors.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Human,
    Json,
}
