use thiserror::Error;

use crate::core::UnitStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid path pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No entry point: pass one on the command line, set DEFT_MAIN, or set `main` in the config")]
    NoEntryPoint,

    #[error("Cannot infer a module name: define() called outside of any module activation")]
    AnonymousDefinition,

    #[error("Module {name} cannot be redefined once {status}")]
    Redefinition { name: String, status: UnitStatus },

    #[error("Cyclic dependency: {}", cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: UnitStatus, to: UnitStatus },

    #[error("Failed to load module {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("Unknown unit: {0}")]
    UnknownUnit(String),
}

/// Failure reported by a resource loader for a single fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no source for {0}")]
    NotFound(String),

    #[error("cannot read {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {locator}: {message}")]
    Parse { locator: String, message: String },

    #[error("rejected: {0}")]
    Rejected(String),
}

pub type Result<T> = std::result::Result<T, Error>;
