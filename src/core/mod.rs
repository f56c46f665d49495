//! Core domain models for dependency resolution.
//!
//! This module contains the unit state machine, the reverse dependency
//! index, and cycle detection over declared dependencies.

pub mod dependents;
pub mod graph;
pub mod unit;

pub use dependents::{Dependent, DependentIndex};
pub use graph::find_cycle;
pub use unit::{
    Decrement, ErrorFn, ModuleId, SuccessFn, TaskId, Unit, UnitKey, UnitKind, UnitStatus,
};
