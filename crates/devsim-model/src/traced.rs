//! # devsim-model::traced
//!
//! A debug decorator: wraps any `Dynamics` and logs every lifecycle call
//! through `tracing` before delegating. Wrap a model in the factory to watch
//! its protocol traffic without touching its code.

use crate::{
    api::{ConfluentKind, DynResult, Dynamics, ExternalEventList, ObservationRequest, RequestEvent},
    ctx::DevsCtx,
};
use devsim_types::{time::Time, value::Value};

pub struct Traced<D> {
    name: String,
    inner: D,
}

impl<D: Dynamics> Traced<D> {
    pub fn new(name: impl Into<String>, inner: D) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: Dynamics> Dynamics for Traced<D> {
    fn init(&mut self, ctx: &mut dyn DevsCtx, t: Time) -> DynResult<Time> {
        let ta = self.inner.init(ctx, t)?;
        tracing::debug!(model = %self.name, t = %t, ta = %ta, "init");
        Ok(ta)
    }

    fn time_advance(&self) -> Time {
        let ta = self.inner.time_advance();
        tracing::trace!(model = %self.name, ta = %ta, "time_advance");
        ta
    }

    fn output(&self, t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        let before = out.len();
        self.inner.output(t, out)?;
        tracing::debug!(model = %self.name, t = %t, events = out.len() - before, "output");
        Ok(())
    }

    fn internal_transition(&mut self, ctx: &mut dyn DevsCtx, t: Time) -> DynResult<()> {
        tracing::debug!(model = %self.name, t = %t, "internal_transition");
        self.inner.internal_transition(ctx, t)
    }

    fn external_transition(
        &mut self,
        ctx: &mut dyn DevsCtx,
        evs: &ExternalEventList,
        t: Time,
    ) -> DynResult<()> {
        tracing::debug!(model = %self.name, t = %t, events = evs.len(), "external_transition");
        self.inner.external_transition(ctx, evs, t)
    }

    fn confluent_transitions(
        &mut self,
        ctx: &mut dyn DevsCtx,
        t: Time,
        evs: &ExternalEventList,
    ) -> DynResult<ConfluentKind> {
        let kind = self.inner.confluent_transitions(ctx, t, evs)?;
        tracing::debug!(model = %self.name, t = %t, events = evs.len(), ?kind, "confluent_transitions");
        Ok(kind)
    }

    fn request(&self, req: &RequestEvent, t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        tracing::debug!(model = %self.name, t = %t, port = %req.port, "request");
        self.inner.request(req, t, out)
    }

    fn observation(&self, obs: &ObservationRequest) -> Option<Value> {
        let value = self.inner.observation(obs);
        tracing::trace!(model = %self.name, port = %obs.port, found = value.is_some(), "observation");
        value
    }

    fn finish(&mut self) {
        tracing::debug!(model = %self.name, "finish");
        self.inner.finish();
    }

    fn is_executive(&self) -> bool {
        self.inner.is_executive()
    }
}
