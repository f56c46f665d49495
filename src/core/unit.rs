//! Unit data model: the common shape of modules and tasks.
//!
//! A unit declares an ordered list of dependency names and a completion
//! callback. It counts how many of its dependencies are still outstanding
//! and runs its callback exactly once, when that count reaches zero.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, FetchError, Result};

/// Callback run once all dependencies are ready.
///
/// Receives the dependencies' exports in declared order; its return value
/// becomes the unit's export (`Value::Null` when there is nothing to export).
pub type SuccessFn = Box<dyn FnOnce(&[Value]) -> Value>;

/// Callback run when fetching a module's source fails.
pub type ErrorFn = Box<dyn FnOnce(&FetchError)>;

/// Identifier of a module. Sequential per engine, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(pub u64);

/// Identifier of a task. Independent sequence from [`ModuleId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Identity of any unit, as held by the dependent index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum UnitKey {
    Module(ModuleId),
    Task(TaskId),
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKey::Module(id) => write!(f, "{}", id),
            UnitKey::Task(id) => write!(f, "{}", id),
        }
    }
}

/// Unit status in its lifecycle.
///
/// Modules walk `Inited -> Fetching -> Fetched -> Executing -> Executed`,
/// or divert to `Error` while fetching. Tasks are never fetched and go
/// straight from `Inited` to `Executing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Inited,
    Fetching,
    Fetched,
    Executing,
    Executed,
    Error,
}

impl UnitStatus {
    /// Position along the forward path. `Error` sits off the path.
    fn rank(self) -> Option<u8> {
        match self {
            UnitStatus::Inited => Some(0),
            UnitStatus::Fetching => Some(1),
            UnitStatus::Fetched => Some(2),
            UnitStatus::Executing => Some(3),
            UnitStatus::Executed => Some(4),
            UnitStatus::Error => None,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, UnitStatus::Executed | UnitStatus::Error)
    }

    /// Whether the unit's callback has started (or finished) running.
    pub fn has_started(self) -> bool {
        matches!(self, UnitStatus::Executing | UnitStatus::Executed)
    }

    /// Check whether moving from `self` to `to` is allowed.
    pub fn can_transition_to(self, to: UnitStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), to.rank()) {
            (Some(from), Some(to)) => to > from,
            (_, None) => self == UnitStatus::Fetching,
            (None, _) => false,
        }
    }
}

impl std::fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UnitStatus::Inited => "inited",
            UnitStatus::Fetching => "fetching",
            UnitStatus::Fetched => "fetched",
            UnitStatus::Executing => "executing",
            UnitStatus::Executed => "executed",
            UnitStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// What distinguishes a module from a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    /// Named, registered, backed by a fetched resource.
    Module { name: String, locator: String },
    /// Anonymous one-off consumption request.
    Task,
}

/// Result of applying one ready signal to a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decrement {
    /// The signal belongs to an earlier resolution pass.
    Stale,
    /// The counter was already zero; the signal was dropped.
    Underflow,
    /// Still waiting on this many dependencies.
    Waiting(usize),
    /// The counter just reached zero.
    Ready,
}

/// A module or a task.
pub struct Unit {
    key: UnitKey,
    kind: UnitKind,
    dependencies: Vec<String>,
    status: UnitStatus,
    pending: usize,
    generation: u64,
    export: Option<Value>,
    on_success: Option<SuccessFn>,
    on_error: Option<ErrorFn>,
}

impl Unit {
    /// Create a module with no definition yet.
    ///
    /// This is the shape of a module first seen as someone else's
    /// dependency; its own definition arrives later.
    pub fn placeholder(id: ModuleId, name: &str, locator: &str) -> Self {
        Self {
            key: UnitKey::Module(id),
            kind: UnitKind::Module {
                name: name.to_string(),
                locator: locator.to_string(),
            },
            dependencies: Vec::new(),
            status: UnitStatus::Inited,
            pending: 0,
            generation: 0,
            export: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Create a task.
    pub fn task(
        id: TaskId,
        dependencies: Vec<String>,
        on_success: SuccessFn,
        on_error: Option<ErrorFn>,
    ) -> Self {
        Self {
            key: UnitKey::Task(id),
            kind: UnitKind::Task,
            dependencies,
            status: UnitStatus::Inited,
            pending: 0,
            generation: 0,
            export: None,
            on_success: Some(on_success),
            on_error,
        }
    }

    pub fn key(&self) -> UnitKey {
        self.key
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    /// Module name; `None` for tasks.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Module { name, .. } => Some(name),
            UnitKind::Task => None,
        }
    }

    /// Module locator; `None` for tasks.
    pub fn locator(&self) -> Option<&str> {
        match &self.kind {
            UnitKind::Module { locator, .. } => Some(locator),
            UnitKind::Task => None,
        }
    }

    /// Human-readable label for logs and reports.
    pub fn label(&self) -> String {
        match &self.kind {
            UnitKind::Module { name, .. } => name.clone(),
            UnitKind::Task => self.key.to_string(),
        }
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    /// Number of dependencies not yet delivered.
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The value produced by the callback; `None` until executed.
    pub fn export(&self) -> Option<&Value> {
        self.export.as_ref()
    }

    /// Whether a definition (callback) is attached or has already run.
    pub fn is_defined(&self) -> bool {
        self.on_success.is_some() || self.status.has_started()
    }

    /// Replace dependencies and callbacks in place.
    pub(crate) fn redefine(
        &mut self,
        dependencies: Vec<String>,
        on_success: SuccessFn,
        on_error: Option<ErrorFn>,
    ) {
        self.dependencies = dependencies;
        self.on_success = Some(on_success);
        self.on_error = on_error;
    }

    /// Move to `to`, rejecting backward and off-path transitions.
    pub fn transition(&mut self, to: UnitStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(Error::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Start a resolution pass: reset the counter to the number of declared
    /// dependencies and return the new generation.
    pub(crate) fn begin_pass(&mut self) -> u64 {
        self.generation += 1;
        self.pending = self.dependencies.len();
        self.generation
    }

    /// Apply one ready signal issued for `generation`.
    pub(crate) fn decrement(&mut self, generation: u64) -> Decrement {
        if generation != self.generation {
            return Decrement::Stale;
        }
        if self.pending == 0 {
            return Decrement::Underflow;
        }
        self.pending -= 1;
        if self.pending == 0 {
            Decrement::Ready
        } else {
            Decrement::Waiting(self.pending)
        }
    }

    pub(crate) fn take_callback(&mut self) -> Option<SuccessFn> {
        self.on_success.take()
    }

    pub(crate) fn take_error_handler(&mut self) -> Option<ErrorFn> {
        self.on_error.take()
    }

    /// Store the export. Write-once.
    pub(crate) fn set_export(&mut self, value: Value) -> Result<()> {
        if self.export.is_some() {
            return Err(Error::Validation(format!(
                "export of {} already set",
                self.label()
            )));
        }
        self.export = Some(value);
        Ok(())
    }
}

impl std::fmt::Debug for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unit")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .field("status", &self.status)
            .field("pending", &self.pending)
            .field("generation", &self.generation)
            .field("export", &self.export)
            .field("defined", &self.on_success.is_some())
            .finish()
    }
}
