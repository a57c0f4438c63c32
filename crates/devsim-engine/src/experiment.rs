//! # devsim-engine::experiment
//!
//! Turns a validated experiment description into a ready-to-run coordinator:
//! registers classes, instantiates the model tree (injecting initial values),
//! then declares views and wires their subscriptions.

use crate::{
    coordinator::Coordinator,
    factory::ModelFactory,
    view::stream::{MemoryStream, SharedRecords, Stream, TextStream},
};
use devsim_types::{
    errors::KernelError,
    experiment::{Experiment, OutputSpec},
};
use indexmap::IndexMap;

/// A coordinator built from an experiment, plus the handles of its in-memory
/// views so the embedder can read them back after the run.
pub struct BuiltExperiment {
    pub coordinator: Coordinator,
    pub memory_views: IndexMap<String, SharedRecords>,
}

/// Builds the initial simulation state. The experiment should have passed
/// [`Experiment::validate`]; everything the graph can re-check is re-checked
/// here anyway.
pub fn build(
    experiment: &Experiment,
    mut factory: ModelFactory,
) -> Result<BuiltExperiment, KernelError> {
    for (name, spec) in &experiment.classes {
        factory.register_class(name.clone(), spec.clone());
    }

    let seed = experiment.seed.unwrap_or_default();
    let mut coordinator = Coordinator::new(factory, seed);
    coordinator.instantiate(None, &experiment.root)?;

    let mut memory_views = IndexMap::new();
    for view in &experiment.views {
        let stream: Box<dyn Stream> = match &view.output {
            OutputSpec::Text => Box::new(TextStream::stdout()),
            OutputSpec::TextFile { path } => {
                Box::new(TextStream::file(path).map_err(|e| KernelError::StreamWrite {
                    view: view.name.clone(),
                    reason: e.to_string(),
                })?)
            }
            OutputSpec::Memory => {
                let (stream, records) = MemoryStream::new();
                memory_views.insert(view.name.clone(), records);
                Box::new(stream)
            }
        };
        coordinator.add_view(&view.name, view.kind, stream)?;
        for sub in &view.subscriptions {
            coordinator.subscribe(&view.name, &sub.model, &sub.port)?;
        }
    }

    Ok(BuiltExperiment {
        coordinator,
        memory_views,
    })
}
