//! # devsim-types
//!
//! This crate provides the foundational, shared data types used across the
//! entire devsim workspace. Its purpose is to break dependency cycles by
//! providing a stable, central location for types that `devsim-engine`,
//! `devsim-model` and `devsim-cli` all need to agree upon.

#![forbid(unsafe_code)]

pub mod errors;
pub mod experiment;
pub mod id;
pub mod metrics;
pub mod time;
pub mod value;
