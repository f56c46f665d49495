//! Definition and require requests accepted by the engine.

use serde_json::Value;

use crate::core::{ErrorFn, SuccessFn};
use crate::error::FetchError;

/// A named module definition.
///
/// The name is optional: an anonymous definition takes the name of the
/// module whose source is currently being activated.
pub struct Definition {
    pub(crate) name: Option<String>,
    pub(crate) dependencies: Vec<String>,
    pub(crate) on_success: SuccessFn,
    pub(crate) on_error: Option<ErrorFn>,
}

impl Definition {
    /// Define `name` with the given dependencies and callback.
    pub fn new<F>(name: &str, dependencies: &[&str], on_success: F) -> Self
    where
        F: FnOnce(&[Value]) -> Value + 'static,
    {
        Self::anonymous(dependencies, on_success).named(name)
    }

    /// Define the module currently being activated.
    pub fn anonymous<F>(dependencies: &[&str], on_success: F) -> Self
    where
        F: FnOnce(&[Value]) -> Value + 'static,
    {
        Self {
            name: None,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            on_success: Box::new(on_success),
            on_error: None,
        }
    }

    /// Set or replace the module name.
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Replace the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Handle a failed fetch of this module instead of aborting the run.
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnOnce(&FetchError) + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl std::fmt::Debug for Definition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// An anonymous request to run code once some modules are ready.
pub struct Requirement {
    pub(crate) dependencies: Vec<String>,
    pub(crate) on_success: SuccessFn,
    pub(crate) on_error: Option<ErrorFn>,
}

impl Requirement {
    pub fn new<F>(dependencies: &[&str], on_success: F) -> Self
    where
        F: FnOnce(&[Value]) -> Value + 'static,
    {
        Self {
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            on_success: Box::new(on_success),
            on_error: None,
        }
    }

    /// Replace the dependency list.
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Stored on the task; tasks are never fetched, so it is never called.
    pub fn on_error<F>(mut self, on_error: F) -> Self
    where
        F: FnOnce(&FetchError) + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl std::fmt::Debug for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requirement")
            .field("dependencies", &self.dependencies)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// One statement of an activated source.
#[derive(Debug)]
pub enum Declaration {
    Define(Definition),
    Require(Requirement),
}

impl From<Definition> for Declaration {
    fn from(definition: Definition) -> Self {
        Declaration::Define(definition)
    }
}

impl From<Requirement> for Declaration {
    fn from(requirement: Requirement) -> Self {
        Declaration::Require(requirement)
    }
}
