#![cfg(test)]

use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;

use crate::event::ServiceAction;
use crate::kernel::Framework;
use crate::plugin_system::{Activator, ActivatorResult, ModuleRegistry, PluginContext};
use crate::service::Properties;
use crate::tests::integration::common::{entries, new_log, write_descriptor, EventLog};

struct Greeting {
    text: String,
}

/// Looks up the greeting service when it starts and records what it found.
struct ConsumerActivator {
    log: EventLog,
}

impl Activator for ConsumerActivator {
    fn start(&self, context: &PluginContext) -> ActivatorResult {
        let greeting = context
            .get_default_service_as::<Greeting>("greeting", None)
            .ok_or("greeting service is not available")?;
        self.log.lock().unwrap().push(greeting.text.clone());
        Ok(())
    }
}

fn modules(log: &EventLog) -> ModuleRegistry {
    let mut modules = ModuleRegistry::new();
    modules.register_component("provider", "greeting/English", || Greeting {
        text: "hello".to_string(),
    });
    modules.register_component("provider", "greeting/French", || Greeting {
        text: "bonjour".to_string(),
    });
    let log = Arc::clone(log);
    modules.register_activator("consumer", "lib/Consumer", move || ConsumerActivator { log: Arc::clone(&log) });
    modules
}

fn write_plugins(root: &TempDir) {
    write_descriptor(
        root.path(),
        "provider",
        r#"{
            "id": "provider",
            "name": "Greeting Provider",
            "version": "1.4",
            "startLevel": 10,
            "services": [
                { "name": "greeting", "service": "greeting/English", "properties": { "lang": "en" } },
                { "name": "greeting", "service": "greeting/French", "properties": { "lang": "fr" } }
            ],
            "extensions": [ { "id": "languages", "data": ["en", "fr"] } ]
        }"#,
    );
    write_descriptor(
        root.path(),
        "consumer",
        r#"{
            "id": "consumer",
            "startLevel": 10,
            "activator": "lib/Consumer",
            "dependencies": [ { "id": "provider", "version": "1.0" } ]
        }"#,
    );
}

#[tokio::test]
async fn test_declared_services_are_available_to_dependents() {
    let root = TempDir::new().unwrap();
    write_plugins(&root);
    let log = new_log();
    let framework = Framework::builder()
        .plugin_dir(root.path())
        .modules(modules(&log))
        .build()
        .unwrap();

    let report = framework.start().await.unwrap();
    assert_eq!(report.started, vec!["provider", "consumer"]);
    assert_eq!(entries(&log), vec!["hello"]);

    let greetings = framework.get_services("greeting", None);
    assert_eq!(greetings.len(), 2);
    for registration in &greetings {
        assert_eq!(registration.property("pluginId"), Some(&json!("provider")));
        assert_eq!(registration.property("pluginName"), Some(&json!("Greeting Provider")));
        assert_eq!(registration.property("pluginVersion"), Some(&json!("1.4.0")));
        assert_eq!(registration.property("global"), Some(&json!(false)));
    }

    let mut french = Properties::new();
    french.insert("lang".to_string(), json!("fr"));
    let found = framework.get_services("greeting", Some(&french));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].downcast::<Greeting>().unwrap().text, "bonjour");

    let languages = framework.get_extensions("languages");
    assert_eq!(languages.len(), 1);
    assert_eq!(languages[0].data(), &json!(["en", "fr"]));
}

#[tokio::test]
async fn test_consumer_fails_without_provider_service() {
    let root = TempDir::new().unwrap();
    write_plugins(&root);
    let log = new_log();
    // No components registered for the provider: its declared services cannot be created.
    let mut registry = ModuleRegistry::new();
    let sink = Arc::clone(&log);
    registry.register_activator("consumer", "lib/Consumer", move || ConsumerActivator { log: Arc::clone(&sink) });
    let framework = Framework::builder()
        .plugin_dir(root.path())
        .modules(registry)
        .build()
        .unwrap();

    let report = framework.start().await.unwrap();
    assert!(report.is_failed("provider"));
    assert!(report.is_failed("consumer"));
    let (_, reason) = report.failed.iter().find(|(id, _)| id == "consumer").unwrap();
    assert!(reason.contains("greeting service is not available"), "reason: {reason}");
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn test_service_events_follow_plugin_lifecycle() {
    let root = TempDir::new().unwrap();
    write_plugins(&root);
    let log = new_log();
    let framework = Framework::builder()
        .plugin_dir(root.path())
        .modules(modules(&log))
        .build()
        .unwrap();

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);
    framework.add_service_listener(move |event| {
        sink.lock().unwrap().push((event.service_name.clone(), event.action));
        Ok(())
    });

    framework.start().await.unwrap();
    framework.get_plugin("provider").unwrap().stop().unwrap();

    let changes = changes.lock().unwrap().clone();
    let adds = changes.iter().filter(|(_, action)| *action == ServiceAction::Add).count();
    let removes = changes.iter().filter(|(_, action)| *action == ServiceAction::Remove).count();
    assert_eq!(adds, 2);
    assert_eq!(removes, 2);
    assert!(changes.iter().all(|(name, _)| name == "greeting"));
}
