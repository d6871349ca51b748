#![cfg(test)]

use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use crate::kernel::error::Error;
use crate::kernel::Framework;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::{Activator, ActivatorResult, InitialState, ModuleRegistry, PluginContext, PluginState};
use crate::service::Properties;
use crate::tests::integration::common::{entries, new_log, plugin, write_descriptor, EventLog};

/// Registers a listener, a service and an extension through its context.
#[derive(Clone)]
struct WiringActivator {
    log: EventLog,
}

impl Activator for WiringActivator {
    fn start(&self, context: &PluginContext) -> ActivatorResult {
        let log = Arc::clone(&self.log);
        context.add_plugin_state_listener(move |event| {
            log.lock()
                .unwrap()
                .push(format!("seen {}:{}", event.plugin_id, event.current));
            Ok(())
        })?;
        context.add_service("wiring", Arc::new(7u32), Properties::new())?;
        context.add_extension("panel", json!({ "title": "Wiring" }))?;
        Ok(())
    }
}

fn framework(log: &EventLog) -> Framework {
    let mut modules = ModuleRegistry::new();
    let activator = WiringActivator { log: Arc::clone(log) };
    modules.register_activator("wiring", "Activator", move || activator.clone());
    Framework::builder()
        .modules(modules)
        .plugin(plugin("wiring", "1.0").build())
        .plugin(plugin("other", "1.0").initial_state(InitialState::Installed).build())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_context_registrations_end_with_the_plugin() {
    let log = new_log();
    let framework = framework(&log);
    framework.start().await.unwrap();

    let wiring = framework.get_plugin("wiring").unwrap();
    let other = framework.get_plugin("other").unwrap();
    assert_eq!(framework.get_services("wiring", None).len(), 1);
    assert_eq!(framework.get_extensions("panel")[0].owner(), "wiring");

    other.start().unwrap();
    assert!(entries(&log).contains(&"seen other:active".to_string()));

    wiring.stop().unwrap();
    assert!(framework.get_services("wiring", None).is_empty());
    assert!(framework.get_extensions("panel").is_empty());

    // The listener went away with the plugin.
    let before = entries(&log).len();
    other.stop().unwrap();
    assert_eq!(entries(&log).len(), before);
}

#[tokio::test]
async fn test_context_is_disposed_after_stop() {
    let log = new_log();
    let framework = framework(&log);
    framework.start().await.unwrap();

    let wiring = framework.get_plugin("wiring").unwrap();
    let context = wiring.context().unwrap();
    assert_eq!(context.plugin_id(), "wiring");
    assert_eq!(context.get_plugins().len(), 2);
    assert_eq!(context.get_default_service_as::<u32>("wiring", None).as_deref(), Some(&7));

    wiring.stop().unwrap();
    assert!(context.is_disposed());
    assert!(context.get_plugin("other").is_none());
    match context.add_service("late", Arc::new(1u8), Properties::new()) {
        Err(Error::PluginSystem(PluginSystemError::ContextDisposed { plugin_id })) => assert_eq!(plugin_id, "wiring"),
        other => panic!("Expected ContextDisposed, got {:?}", other),
    }

    // A restart hands out a fresh context.
    wiring.start().unwrap();
    let fresh = wiring.context().unwrap();
    assert!(!Arc::ptr_eq(&context, &fresh));
    assert!(!fresh.is_disposed());
    assert_eq!(wiring.state(), PluginState::Active);
}

#[tokio::test]
async fn test_context_can_install_plugins() {
    let log = new_log();
    let framework = framework(&log);
    framework.start().await.unwrap();

    let root = TempDir::new().unwrap();
    let dir = write_descriptor(root.path(), "extra", r#"{ "id": "extra" }"#);
    let context = framework.get_plugin("wiring").unwrap().context().unwrap();
    let extra = context.install_plugin(&dir).await.unwrap().unwrap();

    assert_eq!(extra.state(), PluginState::Installed);
    assert!(framework.get_plugin("extra").is_some());
    assert!(entries(&log).contains(&"seen extra:installed".to_string()));
}
