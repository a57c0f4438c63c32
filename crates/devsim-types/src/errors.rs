//! # devsim-types::errors
//!
//! Defines the common error types used throughout the devsim workspace.
//! Every kernel error is fatal to the run: the coordinator tears the
//! simulation down and surfaces a single [`SimulationFailure`] to the
//! embedder.

use crate::{
    id::SimulatorId,
    time::Time,
};
use thiserror::Error;

/// An error raised by user `Dynamics` code. The kernel never inspects the
/// message; it is carried verbatim into the final failure report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DynamicsError(pub String);

impl DynamicsError {
    pub fn msg(message: impl Into<String>) -> Self {
        DynamicsError(message.into())
    }
}

impl From<String> for DynamicsError {
    fn from(message: String) -> Self {
        DynamicsError(message)
    }
}

impl From<&str> for DynamicsError {
    fn from(message: &str) -> Self {
        DynamicsError(message.to_string())
    }
}

/// The broad classification of a kernel error, used in failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ModelFactory,
    Structural,
    Schedule,
    Protocol,
    UserFault,
}

/// Every way a run can die. Variants carry enough context to identify the
/// offending model and operation without a debugger.
#[derive(Error, Debug)]
pub enum KernelError {
    // --- model factory ---
    #[error("dynamics '{name}' is not registered with the model factory")]
    UnknownDynamics { name: String },
    #[error("model factory failed to build dynamics '{name}': {reason}")]
    FactoryFailed { name: String, reason: String },
    #[error("model class '{name}' is not registered")]
    UnknownClass { name: String },

    // --- structural ---
    #[error("duplicate model name '{name}'")]
    DuplicateModel { name: String },
    #[error("model '{model}' not found")]
    UnknownModel { model: String },
    #[error("model '{model}' has no port '{port}'")]
    UnknownPort { model: String, port: String },
    #[error("model '{model}' already has a port '{port}'")]
    DuplicatePort { model: String, port: String },
    #[error("connection from '{src}':{src_port} to '{dst}':{dst_port} already exists")]
    DuplicateConnection {
        src: String,
        src_port: String,
        dst: String,
        dst_port: String,
    },
    #[error("connection from '{src}':{src_port} to '{dst}':{dst_port} does not exist")]
    UnknownConnection {
        src: String,
        src_port: String,
        dst: String,
        dst_port: String,
    },
    #[error("'{src}' and '{dst}' do not share a coupling scope")]
    ScopeMismatch { src: String, dst: String },
    #[error("connection on '{model}' port '{port}' loops back to itself")]
    SelfLoop { model: String, port: String },
    #[error("structural change issued outside an executive transition")]
    NotExecutive,
    #[error("view '{view}' is not declared")]
    UnknownView { view: String },
    #[error("view '{view}' is already declared")]
    DuplicateView { view: String },
    #[error("timed view '{view}' must have a finite positive period")]
    InvalidPeriod { view: String },

    // --- schedule ---
    #[error("time must be a non-negative number, got {value}")]
    InvalidTime { value: f64 },
    #[error("event scheduled at t={event} before current time t={current}")]
    EventInPast { event: Time, current: Time },
    #[error("time advance of '{model}' is negative or NaN")]
    NegativeTimeAdvance { model: String },

    // --- protocol ---
    #[error("'{model}' produced output while quiescent")]
    OutputWhileQuiescent { model: String },
    #[error("zero-delay cascade exceeded {limit} bags at t={time}")]
    CascadeLimit { limit: u64, time: Time },

    // --- user fault ---
    #[error("dynamics of '{model}' failed: {source}")]
    UserFault {
        model: String,
        #[source]
        source: DynamicsError,
    },
    #[error("view '{view}' sink failed: {reason}")]
    StreamWrite { view: String, reason: String },
}

impl KernelError {
    /// Maps the variant onto the coarse error taxonomy of the failure report.
    pub fn kind(&self) -> ErrorKind {
        use KernelError::*;
        match self {
            UnknownDynamics { .. } | FactoryFailed { .. } | UnknownClass { .. } => {
                ErrorKind::ModelFactory
            }
            DuplicateModel { .. }
            | UnknownModel { .. }
            | UnknownPort { .. }
            | DuplicatePort { .. }
            | DuplicateConnection { .. }
            | UnknownConnection { .. }
            | ScopeMismatch { .. }
            | SelfLoop { .. }
            | NotExecutive
            | UnknownView { .. }
            | DuplicateView { .. }
            | InvalidPeriod { .. } => ErrorKind::Structural,
            InvalidTime { .. } | EventInPast { .. } | NegativeTimeAdvance { .. } => {
                ErrorKind::Schedule
            }
            OutputWhileQuiescent { .. } | CascadeLimit { .. } => ErrorKind::Protocol,
            UserFault { .. } | StreamWrite { .. } => ErrorKind::UserFault,
        }
    }
}

/// The single structured error the coordinator hands to the embedder after
/// teardown. `simulator` is present when the failure can be pinned on one
/// model.
#[derive(Error, Debug)]
#[error("simulation failed at t={time}: {kind}")]
pub struct SimulationFailure {
    #[source]
    pub kind: KernelError,
    pub time: Time,
    pub simulator: Option<(SimulatorId, String)>,
}

/// An error related to reading or validating experiment files.
#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("I/O error reading experiment file: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("validation error in experiment '{name}': {message}")]
    Validation { name: String, message: String },
}
