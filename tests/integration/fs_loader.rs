//! End-to-end runs over module files on disk.

use serde_json::json;

use deft::config::Config;
use deft::core::UnitStatus;
use deft::loader::FsLoader;
use deft::runtime::{Engine, EngineConfig};
use deft::{Error, FetchError};

use crate::fixtures::ModuleDir;

/// Test: Module tree loaded from disk
/// Given app.toml -> [./lib/strings.toml, settings] with exports and a
/// require
/// When app is run from the module directory
/// Then every module executes and the exports compose
#[tokio::test]
async fn test_module_tree_from_disk() {
    let dir = ModuleDir::new();
    dir.write(
        "app",
        r#"
        dependencies = ["./lib/strings.toml", "settings"]

        [[require]]
        dependencies = ["app"]
        "#,
    );
    dir.write(
        "lib/strings",
        "export = { greeting = \"hello\" }\n",
    );
    dir.write("settings", "export = { port = 8080 }\n");

    let mut engine = Engine::new(FsLoader::new(dir.path()));
    engine.load_entry("app").unwrap();
    let report = engine.run().await.unwrap();

    assert!(report.is_complete(), "report: {}", report);
    assert_eq!(engine.export("settings"), Some(&json!({"port": 8080})));
    assert_eq!(
        engine.export("./lib/strings.toml"),
        Some(&json!({"greeting": "hello"}))
    );
    assert_eq!(
        engine.export("app"),
        Some(&json!({
            "./lib/strings.toml": {"greeting": "hello"},
            "settings": {"port": 8080}
        }))
    );
    assert_eq!(report.task_exports.len(), 1);
    assert_eq!(
        report.task_exports[0].export,
        json!({"app": engine.export("app").cloned().unwrap()})
    );
}

/// Test: Missing module file is fatal
#[tokio::test]
async fn test_missing_module_file() {
    let dir = ModuleDir::new();
    dir.write("app", "dependencies = [\"absent\"]\n");

    let mut engine = Engine::new(FsLoader::new(dir.path()));
    engine.load_entry("app").unwrap();
    let err = engine.run().await.unwrap_err();

    match err {
        Error::Fetch { name, source } => {
            assert_eq!(name, "absent");
            assert!(matches!(source, FetchError::NotFound(ref l) if l == "./absent.toml"));
        }
        other => panic!("Expected Error::Fetch, got {:?}", other),
    }
    assert_eq!(engine.status("app"), Some(UnitStatus::Fetched));
}

/// Test: Invalid module file is a parse failure
#[tokio::test]
async fn test_invalid_module_file() {
    let dir = ModuleDir::new();
    dir.write("app", "dependencies = [\n");

    let mut engine = Engine::new(FsLoader::new(dir.path()));
    engine.load_entry("app").unwrap();
    let err = engine.run().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Fetch {
            source: FetchError::Parse { .. },
            ..
        }
    ));
}

/// Test: Custom suffix from config
/// Given a config with suffix ".mod"
/// When a module named without suffix is loaded
/// Then its locator uses the configured suffix
#[tokio::test]
async fn test_custom_suffix_from_config() {
    let dir = ModuleDir::new();
    std::fs::write(dir.path().join("app.mod"), "export = \"custom\"\n").unwrap();
    let config = Config {
        suffix: Some(".mod".to_string()),
        ..Default::default()
    };

    let engine_config = EngineConfig::from_config(&config).unwrap();
    let mut engine = Engine::with_config(FsLoader::new(dir.path()), engine_config);
    let id = engine.load_entry("app").unwrap();
    engine.run().await.unwrap();

    assert_eq!(engine.module_by_id(id).unwrap().locator(), Some("./app.mod"));
    assert_eq!(engine.export("app"), Some(&json!("custom")));
}
