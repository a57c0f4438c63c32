//! # devsim-cli::wiring
//!
//! Contains the builtin dynamics registry handed to the engine's model
//! factory, plus the experiment-file loader shared by the subcommands.

use devsim_engine::prelude::{FactoryError, ModelFactory};
use devsim_model::{
    models::{Counter, Generator, RandomGenerator},
    Dynamics,
};
use devsim_types::{
    errors::{DynamicsError, ExperimentError},
    experiment::{Conditions, Experiment},
};
use rand::Rng;
use std::fs;
use std::path::Path;

type DynFactory = fn(&Conditions) -> Result<Box<dyn Dynamics>, DynamicsError>;

/// The central registry of all builtin dynamics.
static REGISTRY: &[(&str, &str, DynFactory)] = &[
    (
        "generator",
        "emits a fixed value at a fixed period",
        |conditions| Generator::from_conditions(conditions).map(|d| Box::new(d) as Box<dyn Dynamics>),
    ),
    (
        "counter",
        "counts incoming external events",
        |conditions| Counter::from_conditions(conditions).map(|d| Box::new(d) as Box<dyn Dynamics>),
    ),
    (
        "random_generator",
        "emits at seeded random intervals",
        |conditions| {
            RandomGenerator::from_conditions(conditions).map(|d| Box::new(d) as Box<dyn Dynamics>)
        },
    ),
];

pub fn registry() -> &'static [(&'static str, &'static str, DynFactory)] {
    REGISTRY
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY.iter().any(|(n, _, _)| *n == name)
}

/// Builds the engine model factory backed by the builtin registry.
pub fn make_factory() -> ModelFactory {
    ModelFactory::new(Box::new(|name, conditions| {
        let (_, _, factory) = REGISTRY
            .iter()
            .find(|(n, _, _)| *n == name)
            .ok_or(FactoryError::Unknown)?;
        factory(conditions).map_err(|e| FactoryError::Failed(e.to_string()))
    }))
}

/// Parses an experiment file, choosing the format by extension.
pub fn load_experiment(path: &Path) -> Result<Experiment, ExperimentError> {
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
        Some("toml") => Ok(toml::from_str(&content)?),
        other => Err(ExperimentError::Validation {
            name: path.display().to_string(),
            message: format!("unsupported experiment file extension {:?}", other),
        }),
    }
}

/// Generates a seed if one is not provided.
pub fn get_seed(opts_seed: Option<u64>, experiment_seed: Option<u64>) -> u64 {
    opts_seed
        .or(experiment_seed)
        .unwrap_or_else(|| rand::thread_rng().gen())
}
