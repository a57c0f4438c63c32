//! # devsim-cli
//!
//! The main entry point for the devsim binary. It parses command-line
//! arguments and dispatches to the appropriate subcommand handler. The
//! process exits 0 on normal completion and non-zero on any kernel or user
//! error.

#![forbid(unsafe_code)]

use crate::args::{Cli, Command};
use anyhow::Result;
use clap::Parser;

mod args;
mod commands;
mod logging;
mod wiring;

fn main() -> Result<()> {
    let args = Cli::parse();

    let quiet = match &args.command {
        Command::Run(opts) => opts.quiet,
        _ => false,
    };
    logging::init(args.log, quiet);

    match args.command {
        Command::Run(opts) => commands::run::exec(opts),
        Command::Validate { experiment } => commands::validate::exec(experiment),
        Command::ListDynamics => commands::list_dynamics::exec(),
    }
}
