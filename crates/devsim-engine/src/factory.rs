//! # devsim-engine::factory
//!
//! The model factory: resolves dynamics names to user `Dynamics` instances
//! through a callback the embedder supplies at construction. The kernel never
//! hard-wires a plugin mechanism; static registries, dynamic loading and test
//! mocks all fit behind the same closure. The factory also owns the class
//! registry of pre-built sub-tree templates the executive can clone.

use devsim_model::Dynamics;
use devsim_types::{
    errors::KernelError,
    experiment::{Conditions, ModelSpec},
};
use indexmap::IndexMap;

/// Why the factory callback could not produce a dynamics instance.
#[derive(Debug)]
pub enum FactoryError {
    /// The name is not bound to any dynamics.
    Unknown,
    /// The name resolved but construction failed.
    Failed(String),
}

/// The embedder-supplied constructor: `(dynamics name, conditions)` to a
/// boxed dynamics.
pub type MakeDynamics =
    Box<dyn FnMut(&str, &Conditions) -> Result<Box<dyn Dynamics>, FactoryError> + Send>;

pub struct ModelFactory {
    make: MakeDynamics,
    classes: IndexMap<String, ModelSpec>,
}

impl ModelFactory {
    pub fn new(make: MakeDynamics) -> Self {
        Self {
            make,
            classes: IndexMap::new(),
        }
    }

    /// Registers a named sub-tree template for `create_model_from_class`.
    pub fn register_class(&mut self, name: impl Into<String>, spec: ModelSpec) {
        self.classes.insert(name.into(), spec);
    }

    pub fn class(&self, name: &str) -> Result<&ModelSpec, KernelError> {
        self.classes
            .get(name)
            .ok_or_else(|| KernelError::UnknownClass {
                name: name.to_string(),
            })
    }

    pub fn build(
        &mut self,
        name: &str,
        conditions: &Conditions,
    ) -> Result<Box<dyn Dynamics>, KernelError> {
        (self.make)(name, conditions).map_err(|e| match e {
            FactoryError::Unknown => KernelError::UnknownDynamics {
                name: name.to_string(),
            },
            FactoryError::Failed(reason) => KernelError::FactoryFailed {
                name: name.to_string(),
                reason,
            },
        })
    }
}
