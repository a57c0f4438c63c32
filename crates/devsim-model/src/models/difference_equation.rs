//! # devsim-model::models::difference_equation
//!
//! A helper for discrete recurrence systems: models whose state advances on a
//! fixed time step by computing each variable from lagged values and external
//! inputs. The user supplies the recurrence as a [`Compute`] implementation;
//! `DifferenceEquation` contains it and speaks the DEVS protocol on its
//! behalf.

use crate::{
    api::{DynResult, Dynamics, ExternalEventList, ObservationRequest},
    ctx::DevsCtx,
};
use devsim_types::{errors::DynamicsError, time::Time, value::Value};
use indexmap::IndexMap;
use std::collections::VecDeque;

/// How many past steps each variable keeps.
const HISTORY_DEPTH: usize = 8;

/// The variable store handed to [`Compute`]. `lag(name, 1)` is the value at
/// the previous step; `lag(name, 0)` the value being computed now.
#[derive(Debug, Default)]
pub struct Variables {
    vars: IndexMap<String, VecDeque<f64>>,
}

impl Variables {
    /// Declares a variable with an initial value.
    pub fn init(&mut self, name: impl Into<String>, value: f64) {
        let mut history = VecDeque::with_capacity(HISTORY_DEPTH);
        history.push_front(value);
        self.vars.insert(name.into(), history);
    }

    /// Sets the variable's value at the current step.
    pub fn set(&mut self, name: &str, value: f64) {
        if let Some(history) = self.vars.get_mut(name) {
            if let Some(front) = history.front_mut() {
                *front = value;
            }
        }
    }

    /// Reads the variable `steps` steps in the past; clamps to the oldest
    /// recorded value for young histories.
    pub fn lag(&self, name: &str, steps: usize) -> f64 {
        self.vars
            .get(name)
            .and_then(|h| h.get(steps.min(h.len().saturating_sub(1))))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn current(&self, name: &str) -> Option<f64> {
        self.vars.get(name).and_then(|h| h.front()).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    /// Opens a new step: every variable's current value is carried forward
    /// and becomes `lag(_, 1)`.
    fn shift(&mut self) {
        for history in self.vars.values_mut() {
            let carried = history.front().copied().unwrap_or(0.0);
            history.push_front(carried);
            history.truncate(HISTORY_DEPTH);
        }
    }
}

/// The user-supplied recurrence.
pub trait Compute: Send {
    /// Declares and initialises the variables.
    fn init_values(&mut self, vars: &mut Variables);

    /// Computes the current step from lagged values, e.g.
    /// `vars.set("a", vars.lag("a", 1) + 1.0)`.
    fn compute(&mut self, vars: &mut Variables, t: Time);
}

pub struct DifferenceEquation<C> {
    step: Time,
    vars: Variables,
    inner: C,
}

impl<C: Compute> DifferenceEquation<C> {
    pub fn new(step: Time, inner: C) -> Result<Self, DynamicsError> {
        if !step.is_finite() || step == Time::ZERO {
            return Err(DynamicsError::msg(
                "difference equation requires a finite positive time step",
            ));
        }
        Ok(Self {
            step,
            vars: Variables::default(),
            inner,
        })
    }

    pub fn variables(&self) -> &Variables {
        &self.vars
    }
}

impl<C: Compute> Dynamics for DifferenceEquation<C> {
    fn init(&mut self, _ctx: &mut dyn DevsCtx, _t: Time) -> DynResult<Time> {
        self.inner.init_values(&mut self.vars);
        Ok(self.step)
    }

    fn time_advance(&self) -> Time {
        self.step
    }

    /// Every variable is published on the output port of the same name.
    fn output(&self, _t: Time, out: &mut ExternalEventList) -> DynResult<()> {
        for name in self.vars.names() {
            if let Some(value) = self.vars.current(name) {
                out.push(name, Value::Double(value));
            }
        }
        Ok(())
    }

    fn internal_transition(&mut self, _ctx: &mut dyn DevsCtx, t: Time) -> DynResult<()> {
        self.vars.shift();
        self.inner.compute(&mut self.vars, t);
        Ok(())
    }

    /// Incoming events overwrite the variable named by the receiving port:
    /// this is how coupled recurrence systems exchange dependencies.
    fn external_transition(
        &mut self,
        _ctx: &mut dyn DevsCtx,
        evs: &ExternalEventList,
        _t: Time,
    ) -> DynResult<()> {
        for ev in evs {
            if let Some(value) = ev.value.as_double() {
                self.vars.set(&ev.port, value);
            }
        }
        Ok(())
    }

    fn observation(&self, obs: &ObservationRequest) -> Option<Value> {
        self.vars.current(&obs.port).map(Value::Double)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp;

    impl Compute for Ramp {
        fn init_values(&mut self, vars: &mut Variables) {
            vars.init("a", 0.0);
            vars.init("b", -3.0);
        }

        fn compute(&mut self, vars: &mut Variables, _t: Time) {
            vars.set("a", vars.lag("a", 1) + 1.0);
            vars.set("b", vars.lag("b", 1) + vars.lag("a", 1) + 1.0);
        }
    }

    #[test]
    fn recurrence_advances_per_step() {
        let mut eq = DifferenceEquation::new(Time::from_f64(1.0), Ramp).unwrap();
        let mut ctx = crate::ctx::NullCtx::new();
        assert_eq!(
            eq.init(&mut ctx, Time::ZERO).unwrap(),
            Time::from_f64(1.0)
        );
        assert_eq!(eq.variables().current("a"), Some(0.0));

        eq.internal_transition(&mut ctx, Time::from_f64(1.0)).unwrap();
        assert_eq!(eq.variables().current("a"), Some(1.0));
        assert_eq!(eq.variables().current("b"), Some(-2.0));

        eq.internal_transition(&mut ctx, Time::from_f64(2.0)).unwrap();
        assert_eq!(eq.variables().current("a"), Some(2.0));
        assert_eq!(eq.variables().current("b"), Some(0.0));
    }

    #[test]
    fn rejects_zero_step() {
        assert!(DifferenceEquation::new(Time::ZERO, Ramp).is_err());
    }
}
