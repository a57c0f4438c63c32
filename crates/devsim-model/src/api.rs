//! # devsim-model::api
//!
//! Defines the core trait for atomic-model dynamics. The engine drives every
//! model exclusively through `dyn Dynamics`; the trait is object safe and all
//! lifecycle methods except [`Dynamics::time_advance`] have default bodies, so
//! a model implements only what it uses.

use crate::ctx::DevsCtx;
use devsim_types::{errors::DynamicsError, time::Time, value::Value};

/// The result type of every fallible dynamics callback. An `Err` is fatal to
/// the run and surfaces as a user fault in the failure report.
pub type DynResult<T> = Result<T, DynamicsError>;

/// A message on a named port. During the output phase the port is one of the
/// emitting model's output ports; on delivery it has been rewritten to the
/// receiving model's input port.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalEvent {
    pub port: String,
    pub value: Value,
}

/// An ordered list of port messages. Models fill one during `output` and
/// receive one in `external_transition`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalEventList(Vec<ExternalEvent>);

impl ExternalEventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, port: impl Into<String>, value: Value) {
        self.0.push(ExternalEvent {
            port: port.into(),
            value,
        });
    }

    pub fn push_event(&mut self, event: ExternalEvent) {
        self.0.push(event);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExternalEvent> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, ExternalEvent> {
        self.0.drain(..)
    }
}

impl From<Vec<ExternalEvent>> for ExternalEventList {
    fn from(events: Vec<ExternalEvent>) -> Self {
        ExternalEventList(events)
    }
}

impl<'a> IntoIterator for &'a ExternalEventList {
    type Item = &'a ExternalEvent;
    type IntoIter = std::slice::Iter<'a, ExternalEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A synchronous query delivered through [`Dynamics::request`]. Unlike an
/// external event it must not change model state; the handler answers by
/// emitting output events.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub port: String,
    pub value: Value,
}

/// A scheduled sample of one state variable, identified by port name.
#[derive(Debug, Clone)]
pub struct ObservationRequest {
    pub port: String,
    pub time: Time,
}

/// The order in which a model wants its coincident internal and external
/// transitions applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfluentKind {
    InternalFirst,
    ExternalFirst,
    ExternalOnly,
}

/// The five DEVS functions plus observation, flattened into one trait.
///
/// Contract highlights, enforced by the wrapping simulator:
/// - `output` and `request` take `&self`: state is frozen between
///   transitions.
/// - `time_advance` must return a non-negative time; infinity means
///   quiescent.
/// - Structural methods on `ctx` succeed only when [`Dynamics::is_executive`]
///   returns true and the call happens inside a transition.
pub trait Dynamics: Send {
    /// Called once when the simulator is created. Returns the first time
    /// advance; the default defers to [`Dynamics::time_advance`].
    fn init(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<Time> {
        Ok(self.time_advance())
    }

    /// Delay until the next internal transition, relative to the last
    /// transition.
    fn time_advance(&self) -> Time;

    /// Emits output events just before an internal (or confluent)
    /// transition.
    fn output(&self, _t: Time, _out: &mut ExternalEventList) -> DynResult<()> {
        Ok(())
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        Ok(())
    }

    fn external_transition(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        _evs: &ExternalEventList,
        _t: Time,
    ) -> DynResult<()> {
        Ok(())
    }

    /// Chooses how to resolve a coincident internal and external transition.
    /// The simulator applies the returned kind; this method itself should not
    /// transition.
    fn confluent_transitions(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        _t: Time,
        _evs: &ExternalEventList,
    ) -> DynResult<ConfluentKind> {
        Ok(ConfluentKind::InternalFirst)
    }

    /// Answers a synchronous query by emitting output events.
    fn request(&self, _req: &RequestEvent, _t: Time, _out: &mut ExternalEventList) -> DynResult<()> {
        Ok(())
    }

    /// Samples one state variable for an observer. `None` means the port has
    /// nothing to report at this instant.
    fn observation(&self, _obs: &ObservationRequest) -> Option<Value> {
        None
    }

    /// Called once at teardown, in both normal completion and failure paths.
    fn finish(&mut self) {}

    /// Executives may mutate the model graph from within their transitions.
    fn is_executive(&self) -> bool {
        false
    }
}
