//! Cyclic definitions.
//!
//! With detection on, a definition closing a cycle is refused before it is
//! applied. With detection off, the cycle is accepted and simply never
//! executes.

use serde_json::{json, Value};

use deft::core::UnitStatus;
use deft::loader::{MemoryLoader, Source};
use deft::runtime::{Definition, Engine, EngineConfig, Requirement};
use deft::Error;

use crate::fixtures::{host_engine, Trace};

fn cyclic_loader() -> MemoryLoader {
    let loader = MemoryLoader::new();
    loader.insert(
        "a",
        Source::new().define(Definition::anonymous(&["b"], |_| json!("a"))),
    );
    loader.insert(
        "b",
        Source::new().define(Definition::anonymous(&["a"], |_| json!("b"))),
    );
    loader
}

/// Test: Three-module cycle refused at definition time
/// Given a -> b and b -> c
/// When c is defined on [a]
/// Then the definition fails with the cycle path and c stays undefined
#[test]
fn test_three_module_cycle_refused() {
    let (mut engine, _) = host_engine();
    engine
        .define(Definition::new("a", &["b"], |_| Value::Null))
        .unwrap();
    engine
        .define(Definition::new("b", &["c"], |_| Value::Null))
        .unwrap();

    let err = engine
        .define(Definition::new("c", &["a"], |_| Value::Null))
        .unwrap_err();

    match err {
        Error::CyclicDependency { cycle } => assert_eq!(cycle, vec!["c", "a", "b", "c"]),
        other => panic!("Expected CyclicDependency, got {:?}", other),
    }
    let c = engine.module("c").unwrap();
    assert!(!c.is_defined());
    assert!(c.dependencies().is_empty());
    assert!(engine.dependents("a").is_empty());
}

/// Test: Self dependency refused
#[test]
fn test_self_dependency_refused() {
    let (mut engine, _) = host_engine();
    let err = engine
        .define(Definition::new("loop", &["loop"], |_| Value::Null))
        .unwrap_err();
    assert!(matches!(err, Error::CyclicDependency { ref cycle } if cycle == &["loop", "loop"]));
    assert_eq!(engine.module_count(), 0);
}

/// Test: Cycle across fetched sources aborts the run
/// Given sources a -> b and b -> a
/// When a is loaded with detection on
/// Then run fails with CyclicDependency
#[tokio::test]
async fn test_cycle_across_sources_aborts_run() {
    let mut engine = Engine::new(cyclic_loader());
    engine.load_entry("a").unwrap();

    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, Error::CyclicDependency { ref cycle } if cycle == &["b", "a", "b"]));
    assert!(err.to_string().contains("b -> a -> b"));
}

/// Test: Cycle stalls with detection off
/// Given sources a -> b and b -> a and a task on [a]
/// When the engine runs with detection off
/// Then the run succeeds, nothing executes, and both modules are stalled
#[tokio::test]
async fn test_cycle_stalls_when_detection_off() {
    let config = EngineConfig {
        detect_cycles: false,
        ..Default::default()
    };
    let mut engine = Engine::with_config(cyclic_loader(), config);
    let trace = Trace::new();
    engine.load_entry("a").unwrap();
    engine
        .require(Requirement::new(&["a"], trace.callback("task", Value::Null)))
        .unwrap();

    let report = engine.run().await.unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.executed, 0);
    assert_eq!(trace.count("task"), 0);
    let mut stalled: Vec<&str> = report.stalled.iter().map(|s| s.label.as_str()).collect();
    stalled.sort();
    assert_eq!(stalled, vec!["a", "b", "task#1"]);
    assert_eq!(engine.status("a"), Some(UnitStatus::Fetched));
}

/// Test: Shared dependencies are not cycles
#[test]
fn test_diamond_is_not_a_cycle() {
    let (mut engine, _) = host_engine();
    engine
        .define(Definition::new("top", &["left", "right"], |_| Value::Null))
        .unwrap();
    engine
        .define(Definition::new("left", &["base"], |_| Value::Null))
        .unwrap();
    engine
        .define(Definition::new("right", &["base"], |_| Value::Null))
        .unwrap();
    engine
        .define(Definition::new("base", &[], |_| Value::Null))
        .unwrap();
    engine.flush().unwrap();

    assert_eq!(engine.status("top"), Some(UnitStatus::Executed));
}
