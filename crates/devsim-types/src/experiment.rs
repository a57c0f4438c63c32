//! # devsim-types::experiment
//!
//! Defines the Rust structs that map directly to the experiment files
//! (YAML/TOML). This is the authoritative schema for describing a simulation:
//! the coupled-model tree, dynamics bindings, initial conditions, views and
//! the horizon.

use crate::{time::Time, value::Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-model initial parameters handed to the dynamics factory.
pub type Conditions = IndexMap<String, Value>;

/// The top-level structure of an experiment definition file.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub seed: Option<u64>,
    pub horizon: Time,
    /// The root of the model tree. Must be a coupled model.
    pub root: ModelSpec,
    /// Named sub-tree templates the executive can clone at run time.
    #[serde(default)]
    pub classes: IndexMap<String, ModelSpec>,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
}

/// One node of the model tree.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    Atomic(AtomicSpec),
    Coupled(CoupledSpec),
}

impl ModelSpec {
    pub fn name(&self) -> &str {
        match self {
            ModelSpec::Atomic(a) => &a.name,
            ModelSpec::Coupled(c) => &c.name,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct AtomicSpec {
    pub name: String,
    /// Name of the dynamics binding resolved through the model factory.
    pub dynamics: String,
    #[serde(default)]
    pub input_ports: Vec<String>,
    #[serde(default)]
    pub output_ports: Vec<String>,
    /// Initial parameters for the dynamics constructor.
    #[serde(default)]
    pub conditions: Conditions,
    /// Values injected as external events on the named input ports at t=0.
    #[serde(default)]
    pub initial: IndexMap<String, Value>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct CoupledSpec {
    pub name: String,
    #[serde(default)]
    pub input_ports: Vec<String>,
    #[serde(default)]
    pub output_ports: Vec<String>,
    #[serde(default)]
    pub children: Vec<ModelSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
}

/// One coupling inside a coupled scope. `src`/`dst` name a direct child, or
/// the literal `"self"` for the coupled model's own boundary ports.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub src: String,
    pub src_port: String,
    pub dst: String,
    pub dst_port: String,
}

pub const SELF_SCOPE: &str = "self";

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ViewSpec {
    pub name: String,
    pub kind: ViewKind,
    #[serde(default)]
    pub output: OutputSpec,
    pub subscriptions: Vec<SubscriptionSpec>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Samples whenever an observed model transitions.
    Event,
    /// Samples on a fixed period along the time axis.
    Timed { period: Time },
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputSpec {
    /// Newline-delimited TAB records; stdout when no path is given.
    #[default]
    Text,
    TextFile {
        path: PathBuf,
    },
    /// In-memory sink, retrievable from the coordinator after the run.
    Memory,
}

/// One observed (model, port) pair. `model` is the full dotted path.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SubscriptionSpec {
    pub model: String,
    pub port: String,
}

impl Experiment {
    /// Validates the experiment for structural consistency. Dynamics names
    /// are resolved later by the model factory; everything checkable without
    /// a factory is checked here.
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.root, ModelSpec::Coupled(_)) {
            return Err("root model must be coupled".to_string());
        }
        let mut paths = Vec::new();
        validate_model(&self.root, "", &mut paths)?;
        for (class, spec) in &self.classes {
            let mut class_paths = Vec::new();
            validate_model(spec, "", &mut class_paths)
                .map_err(|e| format!("class '{}': {}", class, e))?;
        }
        for view in &self.views {
            if let ViewKind::Timed { period } = view.kind {
                if !period.is_finite() || period <= Time::ZERO {
                    return Err(format!(
                        "view '{}' must have a finite positive period",
                        view.name
                    ));
                }
            }
            if view.subscriptions.is_empty() {
                return Err(format!("view '{}' has no subscriptions", view.name));
            }
            for sub in &view.subscriptions {
                if !paths.iter().any(|p| p == &sub.model) {
                    return Err(format!(
                        "view '{}' observes unknown model '{}'",
                        view.name, sub.model
                    ));
                }
            }
        }
        Ok(())
    }
}

fn validate_model(spec: &ModelSpec, prefix: &str, paths: &mut Vec<String>) -> Result<(), String> {
    let name = spec.name();
    if name.is_empty() || name == SELF_SCOPE || name.contains('.') {
        return Err(format!("invalid model name '{}'", name));
    }
    let path = if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    };
    paths.push(path.clone());

    if let ModelSpec::Coupled(coupled) = spec {
        let mut child_names = Vec::new();
        for child in &coupled.children {
            if child_names.contains(&child.name()) {
                return Err(format!(
                    "duplicate child '{}' in coupled model '{}'",
                    child.name(),
                    path
                ));
            }
            child_names.push(child.name());
            validate_model(child, &path, paths)?;
        }
        for conn in &coupled.connections {
            validate_endpoint(coupled, &conn.src, &conn.src_port, false, &path)?;
            validate_endpoint(coupled, &conn.dst, &conn.dst_port, true, &path)?;
            if conn.src == conn.dst {
                return Err(format!(
                    "connection in '{}' loops '{}' back to itself",
                    path, conn.src
                ));
            }
        }
    }
    Ok(())
}

fn validate_endpoint(
    coupled: &CoupledSpec,
    model: &str,
    port: &str,
    incoming: bool,
    path: &str,
) -> Result<(), String> {
    let ports = if model == SELF_SCOPE {
        // A coupling starting at "self" reads the scope's input boundary; one
        // ending at "self" feeds its output boundary.
        if incoming {
            &coupled.output_ports
        } else {
            &coupled.input_ports
        }
    } else {
        let child = coupled
            .children
            .iter()
            .find(|c| c.name() == model)
            .ok_or_else(|| format!("connection in '{}' references unknown child '{}'", path, model))?;
        match child {
            ModelSpec::Atomic(a) => {
                if incoming {
                    &a.input_ports
                } else {
                    &a.output_ports
                }
            }
            ModelSpec::Coupled(c) => {
                if incoming {
                    &c.input_ports
                } else {
                    &c.output_ports
                }
            }
        }
    };
    if !ports.iter().any(|p| p == port) {
        return Err(format!(
            "connection in '{}' references missing port '{}' on '{}'",
            path, port, model
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(name: &str) -> ModelSpec {
        ModelSpec::Atomic(AtomicSpec {
            name: name.to_string(),
            dynamics: "counter".to_string(),
            input_ports: vec!["in".to_string()],
            output_ports: vec![],
            conditions: Conditions::default(),
            initial: IndexMap::new(),
        })
    }

    fn generator(name: &str) -> ModelSpec {
        ModelSpec::Atomic(AtomicSpec {
            name: name.to_string(),
            dynamics: "generator".to_string(),
            input_ports: vec![],
            output_ports: vec!["out".to_string()],
            conditions: Conditions::default(),
            initial: IndexMap::new(),
        })
    }

    fn experiment(connections: Vec<ConnectionSpec>) -> Experiment {
        Experiment {
            name: "test".to_string(),
            seed: None,
            horizon: Time::from_f64(10.0),
            root: ModelSpec::Coupled(CoupledSpec {
                name: "root".to_string(),
                input_ports: vec![],
                output_ports: vec![],
                children: vec![generator("gen"), counter("count")],
                connections,
            }),
            classes: IndexMap::new(),
            views: vec![],
        }
    }

    #[test]
    fn accepts_well_formed_tree() {
        let exp = experiment(vec![ConnectionSpec {
            src: "gen".to_string(),
            src_port: "out".to_string(),
            dst: "count".to_string(),
            dst_port: "in".to_string(),
        }]);
        assert!(exp.validate().is_ok());
    }

    #[test]
    fn rejects_missing_port() {
        let exp = experiment(vec![ConnectionSpec {
            src: "gen".to_string(),
            src_port: "nope".to_string(),
            dst: "count".to_string(),
            dst_port: "in".to_string(),
        }]);
        assert!(exp.validate().unwrap_err().contains("missing port"));
    }

    #[test]
    fn rejects_self_loop() {
        let exp = experiment(vec![ConnectionSpec {
            src: "gen".to_string(),
            src_port: "out".to_string(),
            dst: "gen".to_string(),
            dst_port: "out".to_string(),
        }]);
        assert!(exp.validate().is_err());
    }

    #[test]
    fn rejects_zero_period_view() {
        let mut exp = experiment(vec![]);
        exp.views.push(ViewSpec {
            name: "v".to_string(),
            kind: ViewKind::Timed { period: Time::ZERO },
            output: OutputSpec::Memory,
            subscriptions: vec![SubscriptionSpec {
                model: "root.count".to_string(),
                port: "counter".to_string(),
            }],
        });
        assert!(exp.validate().is_err());
    }
}
