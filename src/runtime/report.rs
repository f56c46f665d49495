//! Summary of an engine run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{TaskId, UnitKey};

/// A unit still waiting on dependencies after the engine went idle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StalledUnit {
    pub unit: UnitKey,
    pub label: String,
    pub pending: usize,
    /// Declared dependencies that have not executed.
    pub waiting_on: Vec<String>,
}

/// Export produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExport {
    pub id: TaskId,
    pub export: Value,
}

/// State of the engine once no fetches or notifications remain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub modules: usize,
    pub tasks: usize,
    /// Units (modules and tasks) whose callback ran.
    pub executed: usize,
    pub stalled: Vec<StalledUnit>,
    /// Modules that were fetched but never defined.
    pub undefined: Vec<String>,
    /// Modules whose fetch failed.
    pub failed: Vec<String>,
    pub task_exports: Vec<TaskExport>,
}

impl RunReport {
    /// Whether every unit that was asked for has executed.
    pub fn is_complete(&self) -> bool {
        self.stalled.is_empty() && self.undefined.is_empty() && self.failed.is_empty()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} modules, {} tasks, {} executed",
            self.modules, self.tasks, self.executed
        )?;
        for stalled in &self.stalled {
            writeln!(
                f,
                "stalled: {} waiting on {}",
                stalled.label,
                stalled.waiting_on.join(", ")
            )?;
        }
        for name in &self.undefined {
            writeln!(f, "undefined: {}", name)?;
        }
        for name in &self.failed {
            writeln!(f, "failed: {}", name)?;
        }
        Ok(())
    }
}
