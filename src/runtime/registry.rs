//! Module registry: unique name -> module, with stable ids.

use std::collections::HashMap;

use crate::core::{ModuleId, Unit};

/// Owns every module the engine has seen.
///
/// Modules are never removed; a name always maps to the same [`ModuleId`]
/// for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct Registry {
    modules: Vec<Unit>,
    by_name: HashMap<String, ModuleId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new module with no definition.
    ///
    /// Returns `None` if `name` is already registered.
    pub fn insert(&mut self, name: &str, locator: &str) -> Option<ModuleId> {
        if self.by_name.contains_key(name) {
            return None;
        }
        let id = ModuleId(self.modules.len() as u64 + 1);
        self.modules.push(Unit::placeholder(id, name, locator));
        self.by_name.insert(name.to_string(), id);
        Some(id)
    }

    pub fn id_of(&self, name: &str) -> Option<ModuleId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, id: ModuleId) -> Option<&Unit> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.modules.get(index)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut Unit> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.modules.get_mut(index)
    }

    pub fn by_name(&self, name: &str) -> Option<&Unit> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// All modules in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.modules.iter()
    }

    /// Every module name with its declared dependencies.
    pub fn declarations(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.modules
            .iter()
            .filter_map(|unit| unit.name().map(|name| (name, unit.dependencies())))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
