use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;

use crate::event::types::{ExtensionChanged, FrameworkStateChanged, PluginStateChanged, ServiceChanged};
use crate::event::{Event, ListenerId, ListenerResult, ListenerSet};

/// Owns the four listener sets of a framework instance.
///
/// Listener ids come from one counter, so an id identifies a registration
/// regardless of its event type.
#[derive(Debug)]
pub struct EventManager {
    next_id: AtomicU64,
    framework: ListenerSet<FrameworkStateChanged>,
    plugin: ListenerSet<PluginStateChanged>,
    service: ListenerSet<ServiceChanged>,
    extension: ListenerSet<ExtensionChanged>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            framework: ListenerSet::default(),
            plugin: ListenerSet::default(),
            service: ListenerSet::default(),
            extension: ListenerSet::default(),
        }
    }

    fn register<E: Event>(
        &self,
        set: &ListenerSet<E>,
        listener: impl Fn(&E) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        set.add(id, Arc::new(listener));
        id
    }

    pub fn add_framework_state_listener(
        &self,
        listener: impl Fn(&FrameworkStateChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(&self.framework, listener)
    }

    pub fn remove_framework_state_listener(&self, id: ListenerId) -> bool {
        self.framework.remove(id)
    }

    pub fn add_plugin_state_listener(
        &self,
        listener: impl Fn(&PluginStateChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(&self.plugin, listener)
    }

    pub fn remove_plugin_state_listener(&self, id: ListenerId) -> bool {
        self.plugin.remove(id)
    }

    pub fn add_service_listener(
        &self,
        listener: impl Fn(&ServiceChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(&self.service, listener)
    }

    pub fn remove_service_listener(&self, id: ListenerId) -> bool {
        self.service.remove(id)
    }

    pub fn add_extension_listener(
        &self,
        listener: impl Fn(&ExtensionChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.register(&self.extension, listener)
    }

    pub fn remove_extension_listener(&self, id: ListenerId) -> bool {
        self.extension.remove(id)
    }

    /// Removes a registration of any event type.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.framework.remove(id) || self.plugin.remove(id) || self.service.remove(id) || self.extension.remove(id)
    }

    pub fn fire_framework_state_changed(&self, event: FrameworkStateChanged) {
        debug!("Framework state {:?} -> {:?}", event.previous, event.current);
        self.framework.fire(&event);
    }

    pub fn fire_plugin_state_changed(&self, event: PluginStateChanged) {
        debug!(
            "Plugin {} state {} -> {}",
            event.plugin_id,
            event.previous.map(|s| s.as_str()).unwrap_or("none"),
            event.current
        );
        self.plugin.fire(&event);
    }

    pub fn fire_service_changed(&self, event: ServiceChanged) {
        self.service.fire(&event);
    }

    pub fn fire_extension_changed(&self, event: ExtensionChanged) {
        self.extension.fire(&event);
    }

    pub fn listener_count(&self) -> usize {
        self.framework.len() + self.plugin.len() + self.service.len() + self.extension.len()
    }

    /// Drops every listener.
    pub fn dispose(&self) {
        self.framework.clear();
        self.plugin.clear();
        self.service.clear();
        self.extension.clear();
    }
}
