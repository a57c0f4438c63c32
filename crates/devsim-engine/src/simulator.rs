//! # devsim-engine::simulator
//!
//! The per-atomic-model wrapper. It owns the user `Dynamics`, tracks the last
//! transition time and enforces the DEVS protocol around every call: user
//! errors become kernel faults tagged with the model, and the quiescence
//! contract on `output` is checked here.

use devsim_model::{
    api::{ConfluentKind, ExternalEventList, ObservationRequest, RequestEvent},
    ctx::DevsCtx,
    Dynamics,
};
use devsim_types::{
    errors::{DynamicsError, KernelError},
    id::SimulatorId,
    time::Time,
    value::Value,
};

pub struct Simulator {
    id: SimulatorId,
    path: String,
    dynamics: Box<dyn Dynamics>,
    last_transition: Time,
    executive: bool,
}

impl Simulator {
    pub fn new(id: SimulatorId, path: impl Into<String>, dynamics: Box<dyn Dynamics>) -> Self {
        let executive = dynamics.is_executive();
        Self {
            id,
            path: path.into(),
            dynamics,
            last_transition: Time::ZERO,
            executive,
        }
    }

    pub fn id(&self) -> SimulatorId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_executive(&self) -> bool {
        self.executive
    }

    pub fn last_transition(&self) -> Time {
        self.last_transition
    }

    fn fault(&self, source: DynamicsError) -> KernelError {
        KernelError::UserFault {
            model: self.path.clone(),
            source,
        }
    }

    /// Initialises the dynamics. Returns the absolute time of the first
    /// internal transition, or `None` when the model starts quiescent.
    pub fn init(&mut self, ctx: &mut dyn DevsCtx, t: Time) -> Result<Option<Time>, KernelError> {
        let ta = self
            .dynamics
            .init(ctx, t)
            .map_err(|e| self.fault(e))?;
        self.last_transition = t;
        Ok(ta.is_finite().then(|| t.saturating_add(ta)))
    }

    /// Runs the output function. State must not change here; the quiescence
    /// check catches models that emit without a scheduled internal.
    pub fn output(&self, t: Time) -> Result<ExternalEventList, KernelError> {
        let mut out = ExternalEventList::new();
        self.dynamics
            .output(t, &mut out)
            .map_err(|e| self.fault(e))?;
        if !out.is_empty() && self.dynamics.time_advance().is_infinite() {
            return Err(KernelError::OutputWhileQuiescent {
                model: self.path.clone(),
            });
        }
        Ok(out)
    }

    pub fn internal_transition(
        &mut self,
        ctx: &mut dyn DevsCtx,
        t: Time,
    ) -> Result<(), KernelError> {
        self.dynamics
            .internal_transition(ctx, t)
            .map_err(|e| self.fault(e))?;
        self.last_transition = t;
        Ok(())
    }

    pub fn external_transition(
        &mut self,
        ctx: &mut dyn DevsCtx,
        evs: &ExternalEventList,
        t: Time,
    ) -> Result<(), KernelError> {
        self.dynamics
            .external_transition(ctx, evs, t)
            .map_err(|e| self.fault(e))?;
        self.last_transition = t;
        Ok(())
    }

    /// Resolves a coincident internal and external transition: asks the
    /// dynamics which order it wants, then applies it.
    pub fn confluent_transitions(
        &mut self,
        ctx: &mut dyn DevsCtx,
        t: Time,
        evs: &ExternalEventList,
    ) -> Result<(), KernelError> {
        let kind = self
            .dynamics
            .confluent_transitions(ctx, t, evs)
            .map_err(|e| self.fault(e))?;
        let result = match kind {
            ConfluentKind::InternalFirst => self
                .dynamics
                .internal_transition(ctx, t)
                .and_then(|()| self.dynamics.external_transition(ctx, evs, t)),
            ConfluentKind::ExternalFirst => self
                .dynamics
                .external_transition(ctx, evs, t)
                .and_then(|()| self.dynamics.internal_transition(ctx, t)),
            ConfluentKind::ExternalOnly => self.dynamics.external_transition(ctx, evs, t),
        };
        result.map_err(|e| self.fault(e))?;
        self.last_transition = t;
        Ok(())
    }

    /// Answers a synchronous query; no state change, no reschedule.
    pub fn request(&self, req: &RequestEvent, t: Time) -> Result<ExternalEventList, KernelError> {
        let mut out = ExternalEventList::new();
        self.dynamics
            .request(req, t, &mut out)
            .map_err(|e| self.fault(e))?;
        Ok(out)
    }

    pub fn observation(&self, port: &str, t: Time) -> Option<Value> {
        self.dynamics.observation(&ObservationRequest {
            port: port.to_string(),
            time: t,
        })
    }

    pub fn time_advance(&self) -> Time {
        self.dynamics.time_advance()
    }

    /// The absolute time of the next internal transition after a transition
    /// at `t`, or `None` when quiescent.
    pub fn next_internal(&self, t: Time) -> Option<Time> {
        let ta = self.dynamics.time_advance();
        ta.is_finite().then(|| t.saturating_add(ta))
    }

    pub fn finish(&mut self) {
        self.dynamics.finish();
    }
}
