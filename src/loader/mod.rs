//! Resource loaders: how a module's source is fetched and activated.
//!
//! The engine asks a loader for each module exactly once, when the module
//! is first referenced. The loader answers asynchronously with either the
//! module's activated [`Source`] or a [`FetchError`]. Loaders never retry.

mod fs;
mod memory;

use futures::future::LocalBoxFuture;

use crate::error::FetchError;
use crate::runtime::{Declaration, Definition, Requirement};

pub use fs::{FsLoader, ModuleFile, RequireEntry};
pub use memory::{Gate, MemoryLoader};

/// What the engine asks a loader to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Bare module name (registry key).
    pub name: String,
    /// Resolved resource locator.
    pub locator: String,
}

/// The result of activating a fetched resource: the declarations it makes.
///
/// Anonymous definitions inside a source take the name of the module that
/// was fetched.
#[derive(Debug, Default)]
pub struct Source {
    pub declarations: Vec<Declaration>,
}

impl Source {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module definition.
    pub fn define(mut self, definition: Definition) -> Self {
        self.declarations.push(Declaration::Define(definition));
        self
    }

    /// Append a require request.
    pub fn require(mut self, requirement: Requirement) -> Self {
        self.declarations.push(Declaration::Require(requirement));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

/// Fetch-and-activate collaborator consumed by the engine.
pub trait ResourceLoader {
    /// Start fetching `request`. The returned future resolves exactly once.
    fn fetch(&self, request: &FetchRequest) -> LocalBoxFuture<'static, Result<Source, FetchError>>;
}
