use std::sync::{Arc, Mutex};

use serde_json::json;

use crate::event::EventManager;
use crate::extension::{Extension, ExtensionManager};

#[test]
fn test_contributions_are_grouped_by_point() {
    let manager = ExtensionManager::new(Arc::new(EventManager::new()));
    manager.add(Extension::new("menu", json!({ "label": "Open" }), "editor"));
    manager.add(Extension::new("menu", json!({ "label": "Save" }), "files"));
    manager.add(Extension::new("toolbar", json!("bold"), "editor"));

    let menu = manager.find("menu");
    assert_eq!(menu.len(), 2);
    assert_eq!(menu[0].data()["label"], "Open");
    assert_eq!(menu[1].owner(), "files");
    assert!(manager.find("statusbar").is_empty());
}

#[test]
fn test_remove_is_by_identity() {
    let manager = ExtensionManager::new(Arc::new(EventManager::new()));
    let first = manager.add(Extension::new("menu", json!(1), "a"));
    let twin = manager.add(Extension::new("menu", json!(1), "a"));

    assert!(manager.remove(&first));
    assert!(!manager.remove(&first));
    let left = manager.find("menu");
    assert_eq!(left.len(), 1);
    assert!(Arc::ptr_eq(&left[0], &twin));
}

#[test]
fn test_remove_by_owner_fires_remove_events() {
    let events = Arc::new(EventManager::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    events.add_extension_listener(move |event| {
        sink.lock()
            .unwrap()
            .push(format!("{} {} {}", event.action, event.extension.id(), event.extension.owner()));
        Ok(())
    });

    let manager = ExtensionManager::new(Arc::clone(&events));
    manager.add(Extension::new("menu", json!(1), "a"));
    manager.add(Extension::new("menu", json!(2), "b"));
    assert_eq!(manager.remove_by_owner("a"), 1);
    assert_eq!(manager.remove_by_owner("a"), 0);

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["add menu a", "add menu b", "remove menu a"]
    );
    assert_eq!(manager.find("menu").len(), 1);
}
