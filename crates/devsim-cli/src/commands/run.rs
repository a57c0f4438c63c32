//! # devsim-cli::commands::run
//!
//! Implements the `run` subcommand: load and validate the experiment, build
//! the coordinator through the builtin registry and run it to the horizon.

use crate::{
    args::RunOpts,
    wiring::{get_seed, load_experiment, make_factory},
};
use anyhow::{anyhow, Context, Result};
use devsim_engine::prelude::{build, Time};

pub fn exec(opts: RunOpts) -> Result<()> {
    let mut experiment = load_experiment(&opts.experiment)
        .with_context(|| format!("reading {}", opts.experiment.display()))?;
    experiment
        .validate()
        .map_err(|message| anyhow!("invalid experiment '{}': {}", experiment.name, message))?;

    let seed = get_seed(opts.seed, experiment.seed);
    experiment.seed = Some(seed);
    let horizon = match opts.horizon {
        Some(h) => Time::new(h).context("invalid --horizon")?,
        None => experiment.horizon,
    };
    println!(
        "Running experiment '{}' with seed {} to t={}",
        experiment.name, seed, horizon
    );

    let built = build(&experiment, make_factory()).context("building experiment")?;
    let mut coordinator = built.coordinator;
    coordinator.set_cycle_limit(opts.cycle_limit);
    coordinator.run(horizon)?;

    println!(
        "Experiment '{}' finished at t={}",
        experiment.name,
        coordinator.current_time()
    );
    for (name, records) in &built.memory_views {
        let records = records.lock().expect("memory view poisoned");
        println!("view '{}': {} samples retained in memory", name, records.len());
    }
    Ok(())
}
