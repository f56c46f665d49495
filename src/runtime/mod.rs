//! The module runtime: definitions, the registry, and the engine that
//! resolves and executes units.

pub mod definition;
pub mod engine;
pub mod event;
pub mod registry;
pub mod report;

pub use definition::{Declaration, Definition, Requirement};
pub use engine::{Engine, EngineConfig};
pub use event::EngineEvent;
pub use registry::Registry;
pub use report::{RunReport, StalledUnit, TaskExport};
