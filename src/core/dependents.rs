//! Reverse dependency index: dependency name -> units waiting on it.

use std::collections::HashMap;

use crate::core::unit::UnitKey;

/// One waiting slot: a unit and the resolution pass that registered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub unit: UnitKey,
    pub generation: u64,
}

/// Maps a dependency name to every slot currently waiting on it.
///
/// The same unit may appear several times under one name (one entry per
/// occurrence in its dependency list); each entry receives its own ready
/// signal.
#[derive(Debug, Default)]
pub struct DependentIndex {
    waiting: HashMap<String, Vec<Dependent>>,
}

impl DependentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slot under `dependency`.
    pub fn register(&mut self, dependency: &str, unit: UnitKey, generation: u64) {
        self.waiting
            .entry(dependency.to_string())
            .or_default()
            .push(Dependent { unit, generation });
    }

    /// Remove and return every slot waiting on `dependency`.
    pub fn take(&mut self, dependency: &str) -> Vec<Dependent> {
        self.waiting.remove(dependency).unwrap_or_default()
    }

    /// Drop every slot held by `unit`, under any name.
    pub fn remove_unit(&mut self, unit: UnitKey) {
        self.waiting.retain(|_, slots| {
            slots.retain(|slot| slot.unit != unit);
            !slots.is_empty()
        });
    }

    /// Slots currently waiting on `dependency`.
    pub fn get(&self, dependency: &str) -> &[Dependent] {
        self.waiting
            .get(dependency)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    #[cfg(test)]
    /// Names that have at least one waiting slot.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.waiting.keys().map(String::as_str)
    }

    #[cfg(test)]
    /// Total number of waiting slots.
    pub fn len(&self) -> usize {
        self.waiting.values().map(Vec::len).sum()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}
