//! # devsim-engine::prelude
//!
//! A convenience module that re-exports the most commonly used types from the
//! engine and its dependencies. This simplifies imports for embedders and for
//! the CLI crate.

pub use crate::{
    control::ControlMsg,
    coordinator::Coordinator,
    events::{CompleteEventBagModel, EventBagModel},
    experiment::{build, BuiltExperiment},
    factory::{FactoryError, MakeDynamics, ModelFactory},
    graph::ModelGraph,
    simulator::Simulator,
    table::EventTable,
    view::{
        stream::{MemoryStream, Record, Sample, SharedRecords, Stream, TextStream},
        View,
    },
};

pub use devsim_model::{
    self, ConfluentKind, DevsCtx, DynResult, Dynamics, ExternalEvent, ExternalEventList, NewModel,
    ObservationRequest, RequestEvent, Traced,
};

pub use devsim_types::{
    self, errors::*, experiment::*, id::*, metrics, time::Time, value::Value,
};
