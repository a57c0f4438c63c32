//! # devsim-model::ctx
//!
//! Defines the `DevsCtx` trait, the interface the engine provides to
//! dynamics during lifecycle calls. For ordinary models it is a read-only
//! window (current time, deterministic seed). For executives it is also the
//! staging surface for structural changes: every mutation issued here is
//! recorded and applied atomically after the executive's transition returns,
//! so routing within the current bag always sees a consistent graph.

use crate::api::DynResult;
use devsim_types::{experiment::Conditions, id::SimulatorId, time::Time};

/// Description of an atomic model an executive wants to create.
#[derive(Debug, Clone)]
pub struct NewModel {
    pub name: String,
    /// Dynamics binding resolved through the model factory.
    pub dynamics: String,
    pub input_ports: Vec<String>,
    pub output_ports: Vec<String>,
    pub conditions: Conditions,
    /// `(view name, port)` subscriptions wired as soon as the model exists.
    pub observables: Vec<(String, String)>,
}

impl NewModel {
    pub fn new(name: impl Into<String>, dynamics: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dynamics: dynamics.into(),
            input_ports: Vec::new(),
            output_ports: Vec::new(),
            conditions: Conditions::default(),
            observables: Vec::new(),
        }
    }

    pub fn input_port(mut self, port: impl Into<String>) -> Self {
        self.input_ports.push(port.into());
        self
    }

    pub fn output_port(mut self, port: impl Into<String>) -> Self {
        self.output_ports.push(port.into());
        self
    }

    pub fn condition(mut self, key: impl Into<String>, value: devsim_types::value::Value) -> Self {
        self.conditions.insert(key.into(), value);
        self
    }

    pub fn observable(mut self, view: impl Into<String>, port: impl Into<String>) -> Self {
        self.observables.push((view.into(), port.into()));
        self
    }
}

/// Engine capabilities exposed to dynamics. Model arguments are full dotted
/// paths (`"root.sub.gen"`).
///
/// All structural methods fail with a structural error when invoked by a
/// non-executive model or outside a transition; for executives they stage the
/// change and return immediately. Staged changes are validated when applied,
/// and a validation failure there is fatal to the run.
pub trait DevsCtx {
    /// The current simulated time.
    fn now(&self) -> Time;

    /// A per-model seed derived deterministically from the experiment seed.
    /// Stochastic dynamics must draw all randomness from a generator seeded
    /// here, or reruns will not be byte-identical.
    fn random_seed(&mut self) -> u64;

    /// Creates an atomic model under the coupled model `parent`. The returned
    /// id is allocated eagerly; the model itself exists once the change is
    /// applied.
    fn create_model(&mut self, parent: &str, model: NewModel) -> DynResult<SimulatorId>;

    /// Clones a pre-registered class sub-tree under the executive's own
    /// parent, renaming its root to `name`.
    fn create_model_from_class(&mut self, class: &str, name: &str) -> DynResult<SimulatorId>;

    /// Deletes a model (recursively for coupled models), all its connections
    /// and every pending event targeting it.
    fn delete_model(&mut self, model: &str) -> DynResult<()>;

    fn add_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> DynResult<()>;

    fn remove_connection(
        &mut self,
        src: &str,
        src_port: &str,
        dst: &str,
        dst_port: &str,
    ) -> DynResult<()>;

    fn add_input_port(&mut self, model: &str, port: &str) -> DynResult<()>;
    fn remove_input_port(&mut self, model: &str, port: &str) -> DynResult<()>;
    fn add_output_port(&mut self, model: &str, port: &str) -> DynResult<()>;
    fn remove_output_port(&mut self, model: &str, port: &str) -> DynResult<()>;
}

/// A context with no engine behind it: time is fixed, the seed is zero, and
/// every structural call fails. Lets dynamics be unit-tested without a
/// coordinator.
pub struct NullCtx {
    pub now: Time,
}

impl NullCtx {
    pub fn new() -> Self {
        Self { now: Time::ZERO }
    }

    pub fn at(now: Time) -> Self {
        Self { now }
    }
}

impl Default for NullCtx {
    fn default() -> Self {
        Self::new()
    }
}

fn no_engine<T>() -> DynResult<T> {
    Err(devsim_types::errors::DynamicsError::msg(
        "structural change issued outside an executive transition",
    ))
}

impl DevsCtx for NullCtx {
    fn now(&self) -> Time {
        self.now
    }

    fn random_seed(&mut self) -> u64 {
        0
    }

    fn create_model(&mut self, _parent: &str, _model: NewModel) -> DynResult<SimulatorId> {
        no_engine()
    }

    fn create_model_from_class(&mut self, _class: &str, _name: &str) -> DynResult<SimulatorId> {
        no_engine()
    }

    fn delete_model(&mut self, _model: &str) -> DynResult<()> {
        no_engine()
    }

    fn add_connection(&mut self, _: &str, _: &str, _: &str, _: &str) -> DynResult<()> {
        no_engine()
    }

    fn remove_connection(&mut self, _: &str, _: &str, _: &str, _: &str) -> DynResult<()> {
        no_engine()
    }

    fn add_input_port(&mut self, _: &str, _: &str) -> DynResult<()> {
        no_engine()
    }

    fn remove_input_port(&mut self, _: &str, _: &str) -> DynResult<()> {
        no_engine()
    }

    fn add_output_port(&mut self, _: &str, _: &str) -> DynResult<()> {
        no_engine()
    }

    fn remove_output_port(&mut self, _: &str, _: &str) -> DynResult<()> {
        no_engine()
    }
}
