//! # devsim-types::id
//!
//! Defines the core identifier types used throughout the kernel.
//! Models live in an arena owned by the coordinator; cross-references between
//! the event table, the model graph and the simulators are ids, never
//! pointers.

/// A unique identifier for a model (atomic or coupled) in the model graph.
/// Ids are allocated monotonically and never reused, so a deleted model's id
/// stays dangling rather than aliasing a newcomer.
pub type ModelId = u32;

/// A unique identifier for a simulator. Every atomic model is wrapped by
/// exactly one simulator, which shares the model's id.
pub type SimulatorId = ModelId;

/// A unique identifier for a scheduled event in the event table.
pub type EventId = u64;
