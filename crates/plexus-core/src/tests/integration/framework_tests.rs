#![cfg(test)]

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use crate::kernel::error::Error;
use crate::kernel::{Framework, FrameworkState};
use crate::plugin_system::{ModuleRegistry, PluginState};
use crate::service::Properties;
use crate::tests::integration::common::{
    entries, new_log, plugin, position, record_plugin_states, v, write_descriptor, EventLog, RecordingActivator,
};

fn recording_modules(ids: &[&str], log: &EventLog) -> ModuleRegistry {
    let mut modules = ModuleRegistry::new();
    for id in ids {
        let activator = RecordingActivator::new(id, log);
        modules.register_activator(id, "Activator", move || activator.clone());
    }
    modules
}

fn record_framework_states(framework: &Framework) -> EventLog {
    let log = new_log();
    let sink = Arc::clone(&log);
    framework.add_framework_state_listener(move |event| {
        sink.lock().unwrap().push(event.current.to_string());
        Ok(())
    });
    log
}

#[tokio::test]
async fn test_levels_dependencies_and_missing_dependency() {
    let root = TempDir::new().unwrap();
    write_descriptor(root.path(), "p1", r#"{ "id": "P1", "version": "1.0", "startLevel": 10 }"#);
    write_descriptor(
        root.path(),
        "p2",
        r#"{ "id": "P2", "startLevel": 20, "dependencies": [ { "id": "P1", "version": "1.0" } ] }"#,
    );
    write_descriptor(
        root.path(),
        "p3",
        r#"{ "id": "P3", "dependencies": [ { "id": "P9", "version": "1.0" } ] }"#,
    );

    let log = new_log();
    let framework = Framework::builder()
        .plugin_dir(root.path())
        .modules(recording_modules(&["P1", "P2", "P3"], &log))
        .build()
        .unwrap();
    let states = record_plugin_states(&framework);

    let report = framework.start().await.unwrap();
    assert_eq!(framework.state(), FrameworkState::Started);
    assert_eq!(report.started, vec!["P1", "P2"]);
    assert_eq!(report.failed.len(), 1);
    let (failed, reason) = &report.failed[0];
    assert_eq!(failed, "P3");
    assert!(reason.contains("P9"), "reason: {reason}");

    let states = entries(&states);
    assert!(position(&states, "P1:active") < position(&states, "P2:starting"));
    assert_eq!(entries(&log), vec!["P1:start", "P2:start"]);

    assert!(framework.is_resolve_success("P2"));
    assert!(!framework.is_resolve_success("P3"));
    assert!(framework.failure_causes("P3")[0].contains("P9"));
    assert_eq!(framework.get_plugin("P3").unwrap().state(), PluginState::Installed);
    assert_eq!(framework.dependencies("P2").unwrap(), vec!["P1"]);
    assert_eq!(framework.dependency_chain("P2").unwrap(), vec!["P1"]);

    framework.stop();
}

#[tokio::test]
async fn test_framework_state_machine() {
    let framework = Framework::builder().plugin(plugin("solo", "1.0").build()).build().unwrap();
    let states = record_framework_states(&framework);
    assert_eq!(framework.state(), FrameworkState::Created);

    // Stopping a framework that never started does nothing.
    framework.stop();
    assert_eq!(framework.state(), FrameworkState::Created);

    framework.start().await.unwrap();
    match framework.start().await {
        Err(Error::InvalidState { operation, state }) => {
            assert_eq!(operation, "start");
            assert_eq!(state, FrameworkState::Started);
        }
        other => panic!("Expected InvalidState, got {:?}", other),
    }

    let solo = framework.get_plugin("solo").unwrap();
    framework.stop();
    assert_eq!(framework.state(), FrameworkState::Stopped);
    assert_eq!(solo.state(), PluginState::Resolved);
    assert!(framework.get_plugins().is_empty());
    assert!(framework.start().await.is_err());

    assert_eq!(entries(&states), vec!["started", "stopping", "stopped"]);
}

#[tokio::test]
async fn test_stop_runs_highest_level_first() {
    let log = new_log();
    let framework = Framework::builder()
        .modules(recording_modules(&["ui", "db", "net"], &log))
        .plugin(plugin("db", "1.0").start_level(1).build())
        .plugin(plugin("net", "1.0").start_level(5).build())
        .plugin(plugin("ui", "1.0").start_level(9).build())
        .build()
        .unwrap();

    framework.start().await.unwrap();
    framework.stop();
    assert_eq!(
        entries(&log),
        vec!["db:start", "net:start", "ui:start", "ui:stop", "net:stop", "db:stop"]
    );
}

#[tokio::test]
async fn test_framework_start_level_limits_plugins() {
    let framework = Framework::builder()
        .start_level(10)
        .plugin(plugin("base", "1.0").start_level(10).build())
        .plugin(plugin("extra", "1.0").start_level(60).build())
        .build()
        .unwrap();

    let report = framework.start().await.unwrap();
    assert_eq!(report.started, vec!["base"]);
    assert!(report.is_failed("extra"));
    assert_eq!(framework.get_plugin("extra").unwrap().state(), PluginState::Installed);
}

#[tokio::test]
async fn test_uninstall_plugin_leaves_dependents_alone() {
    let framework = Framework::builder()
        .plugin(plugin("core", "1.0").build())
        .plugin(plugin("app", "1.0").depends_on("core", v("1.0")).build())
        .build()
        .unwrap();
    framework.start().await.unwrap();

    let core = framework.get_plugin("core").unwrap();
    framework.uninstall_plugin("core").unwrap();
    assert_eq!(core.state(), PluginState::Uninstalled);
    assert!(framework.get_plugin("core").is_none());
    assert!(!framework.is_resolve_success("app"));
    assert_eq!(framework.get_plugin("app").unwrap().state(), PluginState::Active);

    assert!(matches!(framework.uninstall_plugin("core"), Err(Error::InvalidArgument(_))));

    framework.stop();
    assert_eq!(framework.state(), FrameworkState::Stopped);
    assert_eq!(core.state(), PluginState::Uninstalled);
}

#[tokio::test]
async fn test_stop_covers_plugins_installed_after_start() {
    let log = new_log();
    let framework = Framework::builder()
        .modules(recording_modules(&["base", "early", "late"], &log))
        .plugin(plugin("base", "1.0").build())
        .build()
        .unwrap();
    framework.start().await.unwrap();

    let early = framework
        .install_configuration(plugin("early", "1.0").start_level(10).build())
        .unwrap();
    let late = framework
        .install_configuration(plugin("late", "1.0").start_level(60).build())
        .unwrap();
    early.start().unwrap();
    late.start().unwrap();

    framework.stop();
    assert_eq!(early.state(), PluginState::Resolved);
    assert_eq!(late.state(), PluginState::Resolved);
    assert!(early.context().is_none());
    assert!(late.context().is_none());
    assert_eq!(
        entries(&log),
        vec!["base:start", "early:start", "late:start", "base:stop", "late:stop", "early:stop"]
    );
}

#[tokio::test]
async fn test_non_stoppable_plugin_cannot_be_uninstalled_while_started() {
    let framework = Framework::builder()
        .plugin(plugin("pinned", "1.0").stoppable(false).build())
        .build()
        .unwrap();
    framework.start().await.unwrap();

    assert!(framework.uninstall_plugin("pinned").is_err());
    assert_eq!(framework.get_plugin("pinned").unwrap().state(), PluginState::Active);
}

#[test]
fn test_framework_services_are_global() {
    let framework = Framework::builder().build().unwrap();
    let registration = framework
        .add_service("clock", Arc::new(String::from("utc")), Properties::new())
        .unwrap();
    assert_eq!(registration.property("global"), Some(&json!(true)));

    let mut filter = Properties::new();
    filter.insert("global".to_string(), json!(true));
    let clock = framework.get_default_service("clock", Some(&filter)).unwrap();
    assert_eq!(clock.downcast::<String>().ok().unwrap().as_str(), "utc");

    assert!(framework.remove_service(&registration));
    assert!(framework.get_services("clock", None).is_empty());
}

#[tokio::test]
async fn test_dropping_a_started_framework_stops_plugins() {
    let log = new_log();
    {
        let framework = Framework::builder()
            .modules(recording_modules(&["tmp"], &log))
            .plugin(plugin("tmp", "1.0").build())
            .build()
            .unwrap();
        framework.start().await.unwrap();
    }
    assert_eq!(entries(&log), vec!["tmp:start", "tmp:stop"]);
}
