pub mod config;
pub mod core;
pub mod entry;
pub mod error;
pub mod loader;
pub mod log;
pub mod paths;
pub mod runtime;

pub use config::Config;
pub use error::{Error, FetchError, Result};
pub use runtime::{Definition, Engine, EngineConfig, EngineEvent, Requirement, RunReport};
