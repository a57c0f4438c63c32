//! # devsim-cli::commands::validate
//!
//! Implements the `validate` subcommand: structural validation plus a check
//! that every dynamics binding resolves against the builtin registry.

use crate::wiring::{is_registered, load_experiment};
use anyhow::{anyhow, Result};
use devsim_types::experiment::ModelSpec;
use std::path::PathBuf;

pub fn exec(path: PathBuf) -> Result<()> {
    let experiment = load_experiment(&path)?;
    experiment
        .validate()
        .map_err(|message| anyhow!("invalid experiment '{}': {}", experiment.name, message))?;

    let mut unknown = Vec::new();
    collect_unknown_dynamics(&experiment.root, &mut unknown);
    for spec in experiment.classes.values() {
        collect_unknown_dynamics(spec, &mut unknown);
    }
    if !unknown.is_empty() {
        return Err(anyhow!(
            "experiment '{}' references unknown dynamics: {}",
            experiment.name,
            unknown.join(", ")
        ));
    }

    println!("Experiment '{}' is valid.", experiment.name);
    Ok(())
}

fn collect_unknown_dynamics(spec: &ModelSpec, unknown: &mut Vec<String>) {
    match spec {
        ModelSpec::Atomic(atomic) => {
            if !is_registered(&atomic.dynamics) && !unknown.contains(&atomic.dynamics) {
                unknown.push(atomic.dynamics.clone());
            }
        }
        ModelSpec::Coupled(coupled) => {
            for child in &coupled.children {
                collect_unknown_dynamics(child, unknown);
            }
        }
    }
}
