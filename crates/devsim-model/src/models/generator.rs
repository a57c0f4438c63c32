//! # devsim-model::models::generator
//!
//! Emits a fixed value on one output port at a fixed period.

use crate::{
    api::{DynResult, Dynamics, ExternalEventList, ObservationRequest},
    ctx::DevsCtx,
};
use devsim_types::{errors::DynamicsError, experiment::Conditions, time::Time, value::Value};

pub const PORT_OUT: &str = "out";

pub struct Generator {
    period: Time,
    value: Value,
    emitted: i64,
}

impl Generator {
    pub fn new(period: Time) -> Self {
        Self {
            period,
            value: Value::Boolean(true),
            emitted: 0,
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    /// Conditions: `period` (number, required), `value` (any, default
    /// `Boolean(true)`).
    pub fn from_conditions(conditions: &Conditions) -> Result<Self, DynamicsError> {
        let period = conditions
            .get("period")
            .and_then(Value::as_double)
            .ok_or_else(|| DynamicsError::msg("generator requires a numeric 'period' condition"))?;
        let period = Time::new(period)
            .map_err(|e| DynamicsError::msg(format!("generator period: {}", e)))?;
        let mut gen = Generator::new(period);
        if let Some(value) = conditions.get("value") {
            gen.value = value.clone();
        }
        Ok(gen)
    }
}

impl Dynamics for Generator {
    fn time_advance(&self) -> Time {
        self.period
    }

    fn output(&self, _t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        out.push(PORT_OUT, self.value.clone());
        Ok(())
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.emitted += 1;
        Ok(())
    }

    fn observation(&self, obs: &ObservationRequest) -> Option<Value> {
        match obs.port.as_str() {
            "emitted" => Some(Value::Integer(self.emitted)),
            _ => None,
        }
    }
}
