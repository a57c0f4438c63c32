//! # devsim-types::time
//!
//! Defines the representation of simulated time. Time is a non-negative
//! extended real: any finite `f64 >= 0`, or positive infinity for "never".
//! Two times are equal iff their bit patterns are equal, which holds because
//! the constructor rejects NaN and normalises `-0.0` to `0.0`.

use crate::errors::KernelError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A point on (or a span of) the simulated time axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Time(f64);

/// The start of simulated time.
pub const TIME_ZERO: Time = Time(0.0);

/// The quiescent time advance: the model never wakes up on its own.
pub const TIME_INFINITY: Time = Time(f64::INFINITY);

impl Time {
    pub const ZERO: Time = TIME_ZERO;
    pub const INFINITY: Time = TIME_INFINITY;

    /// Builds a time value, rejecting NaN and negative values.
    pub fn new(value: f64) -> Result<Self, KernelError> {
        if value.is_nan() || value < 0.0 {
            return Err(KernelError::InvalidTime { value });
        }
        // -0.0 passes the check above but has a distinct bit pattern.
        Ok(Time(value + 0.0))
    }

    /// Builds a finite time from a non-negative literal. Panics on NaN or
    /// negative input; reserved for constants in tests and bundled models.
    pub fn from_f64(value: f64) -> Self {
        Time::new(value).expect("time literal must be non-negative")
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    pub fn is_infinite(self) -> bool {
        self.0.is_infinite()
    }

    /// Adds a duration; infinity absorbs the sum.
    pub fn saturating_add(self, other: Time) -> Time {
        if self.is_infinite() || other.is_infinite() {
            Time::INFINITY
        } else {
            Time(self.0 + other.0)
        }
    }
}

// NaN is unrepresentable, so the partial order is total.
impl Eq for Time {}

impl Ord for Time {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Time {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl Serialize for Time {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

/// Experiment files write times as plain numbers; TOML and YAML hand them to
/// us as either integers or floats, so the visitor accepts both.
impl<'de> Deserialize<'de> for Time {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimeVisitor;

        impl<'de> de::Visitor<'de> for TimeVisitor {
            type Value = Time;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a non-negative number of simulated time units")
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Time, E> {
                Time::new(value).map_err(|e| E::custom(e.to_string()))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Time, E> {
                self.visit_f64(value as f64)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Time, E> {
                self.visit_f64(value as f64)
            }
        }

        deserializer.deserialize_any(TimeVisitor)
    }
}
