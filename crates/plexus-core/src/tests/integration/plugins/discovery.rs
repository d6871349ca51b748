#![cfg(test)]

use std::fs;

use tempfile::TempDir;

use crate::kernel::error::Error;
use crate::kernel::Framework;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::PluginState;
use crate::tests::integration::common::{entries, record_plugin_states, write_descriptor};

fn ids(framework: &Framework) -> Vec<String> {
    framework.get_plugins().iter().map(|p| p.id().to_string()).collect()
}

#[tokio::test]
async fn test_discovery_skips_broken_and_duplicate_plugins() {
    let root = TempDir::new().unwrap();
    write_descriptor(root.path(), "a-web", r#"{ "id": "web", "version": "1.0" }"#);
    write_descriptor(root.path(), "b-web-copy", r#"{ "id": "web", "version": "2.0" }"#);
    write_descriptor(root.path(), "c-broken", r#"{ "id": "broken", "version": "#);
    write_descriptor(root.path(), "d-nameless", r#"{ "name": "no id" }"#);
    write_descriptor(root.path(), "e-log", r#"{ "id": "log" }"#);
    fs::create_dir_all(root.path().join("f-empty")).unwrap();
    fs::write(root.path().join("README"), "not a plugin").unwrap();

    let framework = Framework::builder().plugin_dir(root.path()).build().unwrap();
    let states = record_plugin_states(&framework);
    let report = framework.start().await.unwrap();

    assert_eq!(ids(&framework), vec!["web", "log"]);
    let web = framework.get_plugin("web").unwrap();
    assert_eq!(web.version().to_string(), "1.0.0");
    assert_eq!(web.configuration().directory(), root.path().join("a-web"));
    assert_eq!(report.started.len(), 2);

    let states = entries(&states);
    assert_eq!(states.iter().filter(|s| *s == "web:installed").count(), 1);
}

#[tokio::test]
async fn test_several_plugin_directories() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write_descriptor(first.path(), "one", r#"{ "id": "one" }"#);
    write_descriptor(second.path(), "two", r#"{ "id": "two" }"#);

    let framework = Framework::builder()
        .plugin_dir(first.path())
        .plugin_dir(second.path())
        .plugin_dir(first.path().join("missing"))
        .build()
        .unwrap();
    framework.start().await.unwrap();

    assert_eq!(ids(&framework), vec!["one", "two"]);
    assert_eq!(framework.plugin_dirs().len(), 3);
}

#[tokio::test]
async fn test_installed_state_plugins_wait_to_be_started() {
    let root = TempDir::new().unwrap();
    write_descriptor(root.path(), "lazy", r#"{ "id": "lazy", "initializedState": "installed" }"#);

    let framework = Framework::builder().plugin_dir(root.path()).build().unwrap();
    let report = framework.start().await.unwrap();
    assert!(report.started.is_empty());

    let lazy = framework.get_plugin("lazy").unwrap();
    assert_eq!(lazy.state(), PluginState::Installed);
    lazy.start().unwrap();
    assert_eq!(lazy.state(), PluginState::Active);
}

#[tokio::test]
async fn test_dynamic_install_completes_missing_dependency() {
    let root = TempDir::new().unwrap();
    write_descriptor(
        root.path(),
        "app",
        r#"{ "id": "app", "dependencies": [ { "id": "lib", "version": "2.0" } ] }"#,
    );
    let framework = Framework::builder().plugin_dir(root.path()).build().unwrap();
    let report = framework.start().await.unwrap();
    assert!(report.is_failed("app"));

    let later = TempDir::new().unwrap();
    let lib_dir = write_descriptor(later.path(), "lib", r#"{ "id": "lib", "version": "2.1" }"#);
    let lib = framework.install_plugin(&lib_dir).await.unwrap().unwrap();
    assert_eq!(lib.state(), PluginState::Installed);
    assert!(framework.is_resolve_success("lib"));
    assert!(framework.is_resolve_success("app"));

    let app = framework.get_plugin("app").unwrap();
    app.start().unwrap();
    assert_eq!(app.state(), PluginState::Active);
}

#[tokio::test]
async fn test_dynamic_install_edge_cases() {
    let framework = Framework::builder().build().unwrap();
    framework.start().await.unwrap();

    let root = TempDir::new().unwrap();
    let empty = root.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    assert!(framework.install_plugin(&empty).await.unwrap().is_none());

    let first = write_descriptor(root.path(), "first", r#"{ "id": "same" }"#);
    let second = write_descriptor(root.path(), "second", r#"{ "id": "same" }"#);
    framework.install_plugin(&first).await.unwrap().unwrap();
    match framework.install_plugin(&second).await {
        Err(Error::PluginSystem(PluginSystemError::DuplicatePlugin { plugin_id, existing })) => {
            assert_eq!(plugin_id, "same");
            assert_eq!(existing, first);
        }
        other => panic!("Expected DuplicatePlugin, got {:?}", other),
    }

    let broken = write_descriptor(root.path(), "broken", "[]");
    assert!(matches!(
        framework.install_plugin(&broken).await,
        Err(Error::PluginSystem(PluginSystemError::Descriptor { .. }))
    ));
}
