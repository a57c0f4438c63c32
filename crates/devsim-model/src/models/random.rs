//! # devsim-model::models::random
//!
//! A stochastic generator: emits the sampled inter-event delay on its output
//! port, with delays drawn uniformly from a configured range. All randomness
//! comes from a ChaCha20 generator seeded through the context, so a rerun
//! with the same experiment seed is byte-identical.

use crate::{
    api::{DynResult, Dynamics, ExternalEventList, ObservationRequest},
    ctx::DevsCtx,
};
use devsim_types::{errors::DynamicsError, experiment::Conditions, time::Time, value::Value};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub const PORT_OUT: &str = "out";

pub struct RandomGenerator {
    min: f64,
    max: f64,
    rng: Option<ChaCha20Rng>,
    next_delay: Time,
    emitted: i64,
}

impl RandomGenerator {
    pub fn new(min: f64, max: f64) -> Result<Self, DynamicsError> {
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || max <= min {
            return Err(DynamicsError::msg(
                "random generator requires 0 <= min < max, both finite",
            ));
        }
        Ok(Self {
            min,
            max,
            rng: None,
            next_delay: Time::INFINITY,
            emitted: 0,
        })
    }

    /// Conditions: `min` (number, default 0), `max` (number, default 1).
    pub fn from_conditions(conditions: &Conditions) -> Result<Self, DynamicsError> {
        let min = conditions.get("min").and_then(Value::as_double).unwrap_or(0.0);
        let max = conditions.get("max").and_then(Value::as_double).unwrap_or(1.0);
        Self::new(min, max)
    }

    fn draw(&mut self) -> DynResult<Time> {
        let rng = self
            .rng
            .as_mut()
            .ok_or_else(|| DynamicsError::msg("random generator used before init"))?;
        let delay = rng.gen_range(self.min..self.max);
        Time::new(delay).map_err(|e| DynamicsError::msg(e.to_string()))
    }
}

impl Dynamics for RandomGenerator {
    fn init(&mut self, ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<Time> {
        self.rng = Some(ChaCha20Rng::seed_from_u64(ctx.random_seed()));
        self.next_delay = self.draw()?;
        Ok(self.next_delay)
    }

    fn time_advance(&self) -> Time {
        self.next_delay
    }

    fn output(&self, _t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        out.push(PORT_OUT, Value::Double(self.next_delay.get()));
        Ok(())
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<()> {
        self.emitted += 1;
        self.next_delay = self.draw()?;
        Ok(())
    }

    fn observation(&self, obs: &ObservationRequest) -> Option<Value> {
        match obs.port.as_str() {
            "emitted" => Some(Value::Integer(self.emitted)),
            "delay" => Some(Value::Double(self.next_delay.get())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::NullCtx;

    #[test]
    fn same_seed_same_delays() {
        let mut ctx = NullCtx::new();
        let mut a = RandomGenerator::new(0.5, 2.0).unwrap();
        let mut b = RandomGenerator::new(0.5, 2.0).unwrap();
        let first_a = a.init(&mut ctx, Time::ZERO).unwrap();
        let first_b = b.init(&mut ctx, Time::ZERO).unwrap();
        assert_eq!(first_a, first_b);
        a.internal_transition(&mut ctx, first_a).unwrap();
        b.internal_transition(&mut ctx, first_b).unwrap();
        assert_eq!(a.time_advance(), b.time_advance());
    }

    #[test]
    fn rejects_bad_range() {
        assert!(RandomGenerator::new(1.0, 1.0).is_err());
        assert!(RandomGenerator::new(-1.0, 2.0).is_err());
    }
}
