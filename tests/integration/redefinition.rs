//! Placeholders, in-place redefinition and rejected redefinitions.

use serde_json::{json, Value};

use deft::core::{ModuleId, UnitKey, UnitStatus};
use deft::loader::{MemoryLoader, Source};
use deft::runtime::{Definition, Engine, Requirement};
use deft::Error;

use crate::fixtures::{host_engine, Trace};

/// Test: Redefinition before execution updates the placeholder in place
/// Given a task waiting on x, and x defined with a dependency on y
/// When x is redefined with no dependencies
/// Then x keeps its id, is not fetched again, runs only the new callback,
/// and the waiting task resolves
#[test]
fn test_redefine_before_execution_updates_in_place() {
    let (mut engine, loader) = host_engine();
    let trace = Trace::new();

    let task = engine
        .require(Requirement::new(&["x"], trace.callback("task", Value::Null)))
        .unwrap();
    let placeholder = engine.module("x").unwrap().key();
    assert!(!engine.module("x").unwrap().is_defined());

    let first = engine
        .define(Definition::new("x", &["y"], trace.callback("x-v1", json!(1))))
        .unwrap();
    let second = engine
        .define(Definition::new("x", &[], trace.callback("x-v2", json!(2))))
        .unwrap();
    engine.flush().unwrap();

    assert_eq!(UnitKey::Module(first), placeholder);
    assert_eq!(first, second);
    assert_eq!(loader.fetch_count("x"), 1);
    assert_eq!(trace.order(), vec!["x-v2", "task"]);
    assert_eq!(trace.args("task"), Some(vec![json!(2)]));
    assert_eq!(engine.task(task).unwrap().status(), UnitStatus::Executed);
    // The abandoned dependency no longer holds a slot for x.
    assert!(engine.dependents("y").is_empty());
}

/// Test: Redefinition after execution is rejected
#[test]
fn test_redefine_after_execution_rejected() {
    let (mut engine, _) = host_engine();
    engine
        .define(Definition::new("done", &[], |_| json!("original")))
        .unwrap();

    let err = engine
        .define(Definition::new("done", &[], |_| json!("replacement")))
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Redefinition {
            ref name,
            status: UnitStatus::Executed
        } if name == "done"
    ));
    assert_eq!(engine.export("done"), Some(&json!("original")));
    assert_eq!(engine.module_count(), 1);
}

/// Test: Anonymous definition outside any activation
#[test]
fn test_anonymous_definition_requires_context() {
    let (mut engine, _) = host_engine();
    let err = engine
        .define(Definition::anonymous(&["a"], |_| Value::Null))
        .unwrap_err();
    assert!(matches!(err, Error::AnonymousDefinition));
    assert_eq!(engine.module_count(), 0);
}

/// Test: A source redefining its own executed module
/// Given a source that defines its module twice
/// When it is activated
/// Then the second definition is ignored with a warning and the run
/// continues
#[tokio::test]
async fn test_redefinition_inside_source_is_not_fatal() {
    let loader = MemoryLoader::new();
    loader.insert(
        "main",
        Source::new()
            .define(Definition::anonymous(&[], |_| json!("first")))
            .define(Definition::anonymous(&[], |_| json!("second")))
            .require(Requirement::new(&["main"], |args| args[0].clone())),
    );
    let mut engine = Engine::new(loader);
    engine.load_entry("main").unwrap();

    let report = engine.run().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(engine.export("main"), Some(&json!("first")));
    assert_eq!(report.task_exports.len(), 1);
    assert_eq!(report.task_exports[0].export, json!("first"));
}

/// Test: A source defining other modules by name
/// Given a bundle source defining a and b by name and itself on [a, b]
/// When the bundle is loaded
/// Then all three execute and the bundle receives both exports
#[tokio::test]
async fn test_bundle_defines_named_modules() {
    let loader = MemoryLoader::new().allow_missing();
    let trace = Trace::new();
    loader.insert(
        "bundle",
        Source::new()
            .define(Definition::new("a", &[], trace.callback("a", json!("A"))))
            .define(Definition::new("b", &["a"], trace.callback("b", json!("B"))))
            .define(Definition::anonymous(
                &["a", "b"],
                trace.callback("bundle", json!("bundle")),
            )),
    );
    let mut engine = Engine::new(loader);
    let id = engine.load_entry("bundle").unwrap();

    let report = engine.run().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(id, ModuleId(1));
    assert_eq!(trace.order(), vec!["a", "b", "bundle"]);
    assert_eq!(trace.args("bundle"), Some(vec![json!("A"), json!("B")]));
    assert_eq!(engine.module("a").unwrap().locator(), Some("./a.toml"));
}
