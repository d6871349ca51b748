//! # Plexus Core Plugin Context
//!
//! The capability handle handed to a started plugin. Everything a plugin
//! registers through its context (listeners, services, extensions) is tied
//! to the plugin's active lifetime and removed when it stops.
use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use log::debug;
use serde_json::Value;

use crate::event::{
    ExtensionChanged, FrameworkStateChanged, ListenerId, ListenerResult, PluginStateChanged, ServiceChanged,
};
use crate::extension::Extension;
use crate::kernel::FrameworkCore;
use crate::kernel::error::Result;
use crate::plugin_system::configuration::PluginConfiguration;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::{CodeLoader, Component};
use crate::plugin_system::plugin::Plugin;
use crate::plugin_system::version::Version;
use crate::service::{Properties, ServiceOwner, ServiceRegistration};

pub struct PluginContext {
    plugin: Weak<Plugin>,
    plugin_id: String,
    plugin_name: String,
    plugin_version: Version,
    core: Weak<FrameworkCore>,
    listeners: Mutex<Vec<ListenerId>>,
    disposed: AtomicBool,
}

impl PluginContext {
    pub(crate) fn new(plugin: Weak<Plugin>, configuration: &PluginConfiguration, core: Weak<FrameworkCore>) -> Self {
        Self {
            plugin,
            plugin_id: configuration.id().to_string(),
            plugin_name: configuration.name().to_string(),
            plugin_version: configuration.version(),
            core,
            listeners: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn plugin(&self) -> Option<Arc<Plugin>> {
        self.plugin.upgrade()
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn core(&self) -> Result<Arc<FrameworkCore>> {
        if self.is_disposed() {
            return Err(PluginSystemError::ContextDisposed {
                plugin_id: self.plugin_id.clone(),
            }
            .into());
        }
        self.core.upgrade().ok_or_else(|| {
            PluginSystemError::FrameworkUnavailable {
                plugin_id: self.plugin_id.clone(),
            }
            .into()
        })
    }

    fn owner(&self) -> ServiceOwner {
        ServiceOwner::Plugin(self.plugin_id.clone())
    }

    fn track(&self, id: ListenerId) -> ListenerId {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
        id
    }

    fn untrack(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tracked| *tracked != id);
    }

    // --- Plugins ---

    pub fn get_plugin(&self, id: &str) -> Option<Arc<Plugin>> {
        self.core().ok()?.installer.get_plugin(id)
    }

    pub fn get_plugins(&self) -> Vec<Arc<Plugin>> {
        self.core()
            .map(|core| core.installer.get_plugins())
            .unwrap_or_default()
    }

    /// Installs a plugin directory and adds it to the resolver.
    pub async fn install_plugin(&self, directory: impl AsRef<Path>) -> Result<Option<Arc<Plugin>>> {
        let core = self.core()?;
        core.installer.install_plugin(directory.as_ref()).await
    }

    // --- Services ---

    /// Registers a service owned by this plugin.
    ///
    /// Unless the caller already set `pluginId`, the owner's id, name and
    /// version are added to the properties along with `global = false`.
    pub fn add_service(
        &self,
        name: &str,
        instance: Component,
        mut properties: Properties,
    ) -> Result<Arc<ServiceRegistration>> {
        let core = self.core()?;
        if !properties.contains_key("pluginId") {
            properties.insert("pluginId".to_string(), Value::from(self.plugin_id.as_str()));
            properties.insert("pluginName".to_string(), Value::from(self.plugin_name.as_str()));
            properties.insert("pluginVersion".to_string(), Value::from(self.plugin_version.to_string()));
            properties.insert("global".to_string(), Value::Bool(false));
        }
        core.services.add(name, instance, self.owner(), properties)
    }

    pub fn remove_service(&self, registration: &ServiceRegistration) -> bool {
        self.core()
            .map(|core| core.services.remove(registration))
            .unwrap_or(false)
    }

    pub fn get_services(&self, name: &str, filter: Option<&Properties>) -> Vec<Arc<ServiceRegistration>> {
        self.core()
            .map(|core| core.services.find_services(name, filter))
            .unwrap_or_default()
    }

    pub fn get_default_service(&self, name: &str, filter: Option<&Properties>) -> Option<Component> {
        self.core().ok()?.services.find_default_service(name, filter)
    }

    /// Like [`get_default_service`](Self::get_default_service), downcast to `T`.
    pub fn get_default_service_as<T: Any + Send + Sync>(&self, name: &str, filter: Option<&Properties>) -> Option<Arc<T>> {
        self.get_default_service(name, filter)?.downcast::<T>().ok()
    }

    // --- Extensions ---

    pub fn add_extension(&self, id: &str, data: Value) -> Result<Arc<Extension>> {
        let core = self.core()?;
        Ok(core.extensions.add(Extension::new(id, data, self.plugin_id.as_str())))
    }

    pub fn remove_extension(&self, extension: &Arc<Extension>) -> bool {
        self.core()
            .map(|core| core.extensions.remove(extension))
            .unwrap_or(false)
    }

    pub fn get_extensions(&self, id: &str) -> Vec<Arc<Extension>> {
        self.core()
            .map(|core| core.extensions.find(id))
            .unwrap_or_default()
    }

    // --- Listeners (removed automatically when the plugin stops) ---

    pub fn add_framework_state_listener(
        &self,
        listener: impl Fn(&FrameworkStateChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> Result<ListenerId> {
        let core = self.core()?;
        Ok(self.track(core.events.add_framework_state_listener(listener)))
    }

    pub fn remove_framework_state_listener(&self, id: ListenerId) -> bool {
        self.untrack(id);
        self.core()
            .map(|core| core.events.remove_framework_state_listener(id))
            .unwrap_or(false)
    }

    pub fn add_plugin_state_listener(
        &self,
        listener: impl Fn(&PluginStateChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> Result<ListenerId> {
        let core = self.core()?;
        Ok(self.track(core.events.add_plugin_state_listener(listener)))
    }

    pub fn remove_plugin_state_listener(&self, id: ListenerId) -> bool {
        self.untrack(id);
        self.core()
            .map(|core| core.events.remove_plugin_state_listener(id))
            .unwrap_or(false)
    }

    pub fn add_service_listener(
        &self,
        listener: impl Fn(&ServiceChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> Result<ListenerId> {
        let core = self.core()?;
        Ok(self.track(core.events.add_service_listener(listener)))
    }

    pub fn remove_service_listener(&self, id: ListenerId) -> bool {
        self.untrack(id);
        self.core()
            .map(|core| core.events.remove_service_listener(id))
            .unwrap_or(false)
    }

    pub fn add_extension_listener(
        &self,
        listener: impl Fn(&ExtensionChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> Result<ListenerId> {
        let core = self.core()?;
        Ok(self.track(core.events.add_extension_listener(listener)))
    }

    pub fn remove_extension_listener(&self, id: ListenerId) -> bool {
        self.untrack(id);
        self.core()
            .map(|core| core.events.remove_extension_listener(id))
            .unwrap_or(false)
    }

    // --- Lifecycle, driven by the owning plugin ---

    /// Registers the services and extensions declared in the descriptor.
    pub(crate) fn start(&self, loader: &CodeLoader, configuration: &PluginConfiguration) -> Result<()> {
        for service in configuration.services() {
            let instance = loader.load(&service.component)?.ok_or_else(|| PluginSystemError::ComponentNotFound {
                plugin_id: self.plugin_id.clone(),
                path: service.component.clone(),
            })?;
            self.add_service(&service.name, instance, service.properties.clone())?;
        }
        for extension in configuration.extensions() {
            self.add_extension(&extension.id, extension.data.clone())?;
        }
        Ok(())
    }

    /// Removes every listener, extension and service this plugin registered.
    pub(crate) fn stop(&self) {
        let listeners: Vec<ListenerId> = std::mem::take(&mut *self.listeners.lock().unwrap_or_else(PoisonError::into_inner));
        let Some(core) = self.core.upgrade() else {
            return;
        };
        for id in listeners {
            core.events.remove_listener(id);
        }
        let extensions = core.extensions.remove_by_owner(&self.plugin_id);
        let services = core.services.remove_by_owner(&self.owner());
        debug!(
            "Plugin {} released {} services and {} extensions",
            self.plugin_id, services, extensions
        );
    }

    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_id", &self.plugin_id)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
