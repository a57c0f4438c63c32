//! # devsim-model::models::counter
//!
//! Counts incoming external events. Quiescent on its own: it only ever
//! reacts to input.

use crate::{
    api::{DynResult, Dynamics, ExternalEventList, ObservationRequest},
    ctx::DevsCtx,
};
use devsim_types::{errors::DynamicsError, experiment::Conditions, time::Time, value::Value};

pub const PORT_IN: &str = "in";
pub const PORT_COUNTER: &str = "counter";

#[derive(Default)]
pub struct Counter {
    count: i64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_conditions(_conditions: &Conditions) -> Result<Self, DynamicsError> {
        Ok(Self::default())
    }

    pub fn count(&self) -> i64 {
        self.count
    }
}

impl Dynamics for Counter {
    fn time_advance(&self) -> Time {
        Time::INFINITY
    }

    fn external_transition(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        evs: &ExternalEventList,
        _t: Time,
    ) -> DynResult<()> {
        self.count += evs.len() as i64;
        Ok(())
    }

    fn observation(&self, obs: &ObservationRequest) -> Option<Value> {
        match obs.port.as_str() {
            PORT_COUNTER => Some(Value::Integer(self.count)),
            _ => None,
        }
    }
}
