//! Filesystem loader for TOML module files.
//!
//! A module file looks like:
//!
//! ```toml
//! dependencies = ["util", "strings"]
//!
//! [export]
//! greeting = "hello"
//!
//! [[require]]
//! dependencies = ["report"]
//! ```
//!
//! The module's callback returns `export` when present, otherwise an object
//! mapping each dependency name to that dependency's export. Each
//! `[[require]]` table becomes a task returning the same kind of object.

use std::path::{Path, PathBuf};

use futures::future::{FutureExt, LocalBoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{FetchRequest, ResourceLoader, Source};
use crate::dlog_debug;
use crate::error::FetchError;
use crate::runtime::{Definition, Requirement};

/// On-disk shape of a module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleFile {
    /// Explicit module name; defaults to the name the file was fetched as.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
    #[serde(default, rename = "require", skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequireEntry>,
}

/// A `[[require]]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequireEntry {
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl ModuleFile {
    /// Turn the file into the declarations it makes when activated.
    pub fn into_source(self) -> Source {
        let ModuleFile {
            name,
            dependencies,
            export,
            requires,
        } = self;

        let names = dependencies.clone();
        let mut definition = Definition::anonymous(&[], move |args| {
            export.unwrap_or_else(|| by_dependency(&names, args))
        })
        .with_dependencies(dependencies);
        if let Some(name) = name {
            definition = definition.named(&name);
        }

        let mut source = Source::new().define(definition);
        for entry in requires {
            let names = entry.dependencies.clone();
            source = source.require(
                Requirement::new(&[], move |args| by_dependency(&names, args))
                    .with_dependencies(entry.dependencies),
            );
        }
        source
    }
}

/// Pair dependency names with their exports.
fn by_dependency(names: &[String], exports: &[Value]) -> Value {
    let map: Map<String, Value> = names
        .iter()
        .cloned()
        .zip(exports.iter().cloned())
        .collect();
    Value::Object(map)
}

/// Loads module files relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a locator: absolute locators are used as-is, others
    /// are joined to the root.
    pub fn resolve(&self, locator: &str) -> PathBuf {
        let relative = locator.strip_prefix("./").unwrap_or(locator);
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ResourceLoader for FsLoader {
    fn fetch(&self, request: &FetchRequest) -> LocalBoxFuture<'static, Result<Source, FetchError>> {
        let path = self.resolve(&request.locator);
        let locator = request.locator.clone();
        dlog_debug!("FsLoader::fetch {} -> {}", request.name, path.display());

        async move {
            let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    FetchError::NotFound(locator.clone())
                } else {
                    FetchError::Io {
                        locator: locator.clone(),
                        source: e,
                    }
                }
            })?;
            let file: ModuleFile = toml::from_str(&text).map_err(|e| FetchError::Parse {
                locator: locator.clone(),
                message: e.to_string(),
            })?;
            Ok(file.into_source())
        }
        .boxed_local()
    }
}
