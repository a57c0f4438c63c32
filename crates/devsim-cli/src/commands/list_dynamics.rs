//! # devsim-cli::commands::list_dynamics
//!
//! Implements the `list-dynamics` subcommand.

use crate::wiring::registry;
use anyhow::Result;

pub fn exec() -> Result<()> {
    println!("Available dynamics:");
    for (name, description, _) in registry() {
        println!("  {:<20} {}", name, description);
    }
    Ok(())
}
