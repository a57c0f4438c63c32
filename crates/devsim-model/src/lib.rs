//! # devsim-model
//!
//! This crate provides the SDK for implementing atomic-model dynamics to be
//! run by the devsim kernel. It defines the core trait (`Dynamics`), the
//! context object (`DevsCtx`) through which executives mutate the model
//! graph, and a small library of bundled models.

#![forbid(unsafe_code)]

pub mod api;
pub mod ctx;
pub mod models;
pub mod traced;

pub use api::{
    ConfluentKind, DynResult, Dynamics, ExternalEvent, ExternalEventList, ObservationRequest,
    RequestEvent,
};
pub use ctx::{DevsCtx, NewModel, NullCtx};
pub use traced::Traced;
