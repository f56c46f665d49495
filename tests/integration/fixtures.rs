//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Recording callback invocations and their arguments
//! - Letting a running engine catch up between gate openings
//! - Temporary module directories for the filesystem loader

#![allow(dead_code)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tempfile::TempDir;
use tokio::sync::mpsc;

use deft::loader::MemoryLoader;
use deft::runtime::{Engine, EngineEvent};

/// Records every callback call: who ran, in which order, with which
/// arguments.
#[derive(Clone, Default)]
pub struct Trace {
    calls: Rc<RefCell<Vec<(String, Vec<Value>)>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A success callback that records `label` and returns `export`.
    pub fn callback(&self, label: &str, export: Value) -> impl FnOnce(&[Value]) -> Value + 'static {
        let calls = Rc::clone(&self.calls);
        let label = label.to_string();
        move |args| {
            calls.borrow_mut().push((label, args.to_vec()));
            export
        }
    }

    /// Labels in call order.
    pub fn order(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(l, _)| l.clone()).collect()
    }

    /// Arguments of the first call recorded under `label`.
    pub fn args(&self, label: &str) -> Option<Vec<Value>> {
        self.calls
            .borrow()
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, args)| args.clone())
    }

    pub fn count(&self, label: &str) -> usize {
        self.calls.borrow().iter().filter(|(l, _)| l == label).count()
    }
}

/// An engine whose loader serves empty sources for any name, so modules
/// can be defined directly by the test.
pub fn host_engine() -> (Engine, MemoryLoader) {
    let loader = MemoryLoader::new().allow_missing();
    (Engine::new(loader.clone()), loader)
}

/// Yield enough times for a concurrently running engine to process every
/// fetch that has completed so far.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Drain every event received so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<EngineEvent>) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// A temporary directory of module files.
pub struct ModuleDir {
    pub temp_dir: TempDir,
}

impl ModuleDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `<name>.toml` with `contents`, creating parent directories.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(format!("{}.toml", name));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create module directory");
        }
        std::fs::write(&path, contents).expect("Failed to write module file");
        path
    }
}
