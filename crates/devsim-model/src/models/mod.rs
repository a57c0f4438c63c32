//! # devsim-model::models
//!
//! A small library of bundled dynamics. They serve three purposes: reference
//! implementations for SDK users, building blocks for the CLI's builtin
//! registry, and fixtures for the engine's integration tests.

pub mod counter;
pub mod difference_equation;
pub mod generator;
pub mod random;

pub use counter::Counter;
pub use difference_equation::{Compute, DifferenceEquation, Variables};
pub use generator::Generator;
pub use random::RandomGenerator;
