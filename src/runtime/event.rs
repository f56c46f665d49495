//! Events emitted by the engine for unit lifecycle changes.
//!
//! These let a host (or a test) observe resolution progress without
//! polling the engine.

use serde::{Deserialize, Serialize};

use crate::core::{ModuleId, TaskId, UnitKey};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum EngineEvent {
    /// A module entered the registry (defined or referenced).
    ModuleCreated { id: ModuleId, name: String },
    /// The loader was asked for a module's source.
    FetchStarted { id: ModuleId, locator: String },
    /// A module's source was fetched and is about to be activated.
    Fetched { id: ModuleId },
    /// A fetch failed and the module moved to Error.
    FetchFailed { id: ModuleId, error: String },
    /// A fetch failed and the module's error handler took it.
    FetchRecovered { id: ModuleId, error: String },
    /// A task was created by `require`.
    TaskCreated { id: TaskId },
    /// A unit's dependencies were counted and registered.
    Resolved { unit: UnitKey, pending: usize },
    /// A unit's callback ran and its export is available.
    Executed { unit: UnitKey },
}
