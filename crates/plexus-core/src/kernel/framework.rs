//! # Plexus Core Framework
//!
//! The [`Framework`] composes installer, resolver and starter and owns the
//! framework state machine (CREATED → STARTED → STOPPING → STOPPED). It is
//! constructed explicitly and passed around; there is no global instance.
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use serde_json::Value;

use crate::config::RuntimeConfig;
use crate::event::{
    EventManager, ExtensionChanged, FrameworkStateChanged, ListenerId, ListenerResult, PluginStateChanged,
    ServiceChanged,
};
use crate::extension::{Extension, ExtensionManager};
use crate::kernel::error::{Error, Result};
use crate::kernel::state::FrameworkState;
use crate::plugin_system::{
    Component, ModuleRegistry, Plugin, PluginConfiguration, PluginInstaller, PluginResolver, PluginStarter,
    StartReport, StarterPolicy,
};
use crate::service::{Properties, ServiceManager, ServiceOwner, ServiceRegistration};

/// State shared by the framework, its plugins and their contexts.
///
/// Plugins and contexts only hold weak references to it.
pub(crate) struct FrameworkCore {
    pub(crate) config: RuntimeConfig,
    state: Mutex<FrameworkState>,
    pub(crate) events: Arc<EventManager>,
    pub(crate) services: ServiceManager,
    pub(crate) extensions: ExtensionManager,
    resolver: Mutex<PluginResolver>,
    pub(crate) installer: PluginInstaller,
}

impl FrameworkCore {
    fn new(config: RuntimeConfig, modules: ModuleRegistry) -> Arc<Self> {
        Arc::new_cyclic(|core| {
            let events = Arc::new(EventManager::new());
            FrameworkCore {
                installer: PluginInstaller::new(config.plugin_dirs.clone(), core.clone(), Arc::new(modules)),
                services: ServiceManager::new(Arc::clone(&events)),
                extensions: ExtensionManager::new(Arc::clone(&events)),
                resolver: Mutex::new(PluginResolver::default()),
                state: Mutex::new(FrameworkState::Created),
                events,
                config,
            }
        })
    }

    pub(crate) fn state(&self) -> FrameworkState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn start_level(&self) -> i32 {
        self.config.start_level
    }

    pub(crate) fn resolver(&self) -> MutexGuard<'_, PluginResolver> {
        self.resolver.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, current: FrameworkState) {
        let previous = std::mem::replace(&mut *self.state.lock().unwrap_or_else(PoisonError::into_inner), current);
        if previous != current {
            info!("Framework {}", current);
            self.events
                .fire_framework_state_changed(FrameworkStateChanged { previous, current });
        }
    }

    /// Moves `from -> to` only if the framework is still in `from`.
    fn transition(&self, from: FrameworkState, to: FrameworkState) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != from {
                return false;
            }
            *state = to;
        }
        info!("Framework {}", to);
        self.events
            .fire_framework_state_changed(FrameworkStateChanged { previous: from, current: to });
        true
    }
}

/// The plugin container.
pub struct Framework {
    core: Arc<FrameworkCore>,
    starter: Mutex<Option<PluginStarter>>,
    start_requested: AtomicBool,
}

impl Framework {
    pub fn new(config: RuntimeConfig, modules: ModuleRegistry) -> Self {
        Self {
            core: FrameworkCore::new(config, modules),
            starter: Mutex::new(None),
            start_requested: AtomicBool::new(false),
        }
    }

    pub fn builder() -> FrameworkBuilder {
        FrameworkBuilder::new()
    }

    pub fn state(&self) -> FrameworkState {
        self.core.state()
    }

    pub fn start_level(&self) -> i32 {
        self.core.start_level()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.core.config
    }

    pub fn events(&self) -> &EventManager {
        &self.core.events
    }

    /// Discovers, resolves and starts plugins, then enters STARTED.
    ///
    /// Individual start failures are reported, not returned: only calling
    /// `start` outside CREATED is an error.
    pub async fn start(&self) -> Result<StartReport> {
        let state = self.state();
        if state != FrameworkState::Created || self.start_requested.swap(true, Ordering::AcqRel) {
            return Err(Error::InvalidState {
                operation: "start",
                state,
            });
        }
        info!("Starting framework at start level {}", self.start_level());

        self.core.installer.install_plugins().await;
        let plugins = self.core.installer.get_plugins();

        let mut resolver = PluginResolver::new(plugins.iter().map(|plugin| plugin.configuration()));
        resolver.resolve();
        for plugin in &plugins {
            if resolver.is_resolve_success(plugin.id()) {
                if let Some(chain) = resolver.dependency_chain(plugin.id()) {
                    debug!("Plugin {} dependency chain: [{}]", plugin.id(), chain.join(", "));
                }
            } else {
                for cause in resolver.failure_causes(plugin.id()) {
                    warn!("{}", cause);
                }
            }
        }
        *self.core.resolver() = resolver;

        let starter = PluginStarter::new(plugins, self.core.config.starter_policy());
        let report = starter.start_plugins(&self.core.resolver);
        *self.lock_starter() = Some(starter);

        self.core.set_state(FrameworkState::Started);
        Ok(report)
    }

    /// Stops every plugin and disposes the registries. Does nothing unless STARTED.
    pub fn stop(&self) {
        if !self.core.transition(FrameworkState::Started, FrameworkState::Stopping) {
            debug!("Framework is {}; nothing to stop", self.state());
            return;
        }

        let starter = self.lock_starter().take();
        if let Some(mut starter) = starter {
            starter.stop_plugins(&self.core.resolver);
            starter.dispose();
        }
        PluginStarter::stop_remaining(self.core.installer.get_plugins());

        self.core.extensions.dispose();
        self.core.services.dispose();
        self.core.resolver().dispose();
        self.core.installer.dispose();
        self.core.set_state(FrameworkState::Stopped);
        self.core.events.dispose();
    }

    fn lock_starter(&self) -> MutexGuard<'_, Option<PluginStarter>> {
        self.starter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Plugins ---

    pub fn get_plugin(&self, id: &str) -> Option<Arc<Plugin>> {
        self.core.installer.get_plugin(id)
    }

    pub fn get_plugins(&self) -> Vec<Arc<Plugin>> {
        self.core.installer.get_plugins()
    }

    pub fn plugin_dirs(&self) -> &[PathBuf] {
        self.core.installer.directories()
    }

    /// Installs one plugin directory and adds it to the resolver.
    pub async fn install_plugin(&self, directory: impl AsRef<Path>) -> Result<Option<Arc<Plugin>>> {
        self.core.installer.install_plugin(directory.as_ref()).await
    }

    /// Installs a plugin declared in code and adds it to the resolver.
    pub fn install_configuration(&self, configuration: PluginConfiguration) -> Result<Arc<Plugin>> {
        self.core.installer.install_configuration(configuration)
    }

    /// Uninstalls a plugin and drops it from the resolver and the installer.
    ///
    /// Dependents stay as they are; they are not stopped.
    pub fn uninstall_plugin(&self, id: &str) -> Result<()> {
        let plugin = self
            .get_plugin(id)
            .ok_or_else(|| Error::InvalidArgument(format!("plugin {id} is not installed")))?;
        plugin.uninstall()?;
        self.core.resolver().remove(id);
        self.core.installer.remove(id);
        Ok(())
    }

    // --- Resolution queries ---

    pub fn is_resolve_success(&self, id: &str) -> bool {
        self.core.resolver().is_resolve_success(id)
    }

    pub fn dependencies(&self, id: &str) -> Option<Vec<String>> {
        self.core.resolver().dependencies(id).map(<[String]>::to_vec)
    }

    pub fn dependency_chain(&self, id: &str) -> Option<Vec<String>> {
        self.core.resolver().dependency_chain(id)
    }

    pub fn failure_causes(&self, id: &str) -> Vec<String> {
        self.core.resolver().failure_causes(id)
    }

    // --- Services and extensions ---

    /// Registers a framework-owned service; `global` defaults to `true`.
    pub fn add_service(&self, name: &str, instance: Component, mut properties: Properties) -> Result<Arc<ServiceRegistration>> {
        properties
            .entry("global".to_string())
            .or_insert(Value::Bool(true));
        self.core
            .services
            .add(name, instance, ServiceOwner::Framework, properties)
    }

    pub fn remove_service(&self, registration: &ServiceRegistration) -> bool {
        self.core.services.remove(registration)
    }

    pub fn get_services(&self, name: &str, filter: Option<&Properties>) -> Vec<Arc<ServiceRegistration>> {
        self.core.services.find_services(name, filter)
    }

    pub fn get_default_service(&self, name: &str, filter: Option<&Properties>) -> Option<Component> {
        self.core.services.find_default_service(name, filter)
    }

    pub fn get_extensions(&self, id: &str) -> Vec<Arc<Extension>> {
        self.core.extensions.find(id)
    }

    // --- Listeners ---

    pub fn add_framework_state_listener(
        &self,
        listener: impl Fn(&FrameworkStateChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.events.add_framework_state_listener(listener)
    }

    pub fn remove_framework_state_listener(&self, id: ListenerId) -> bool {
        self.core.events.remove_framework_state_listener(id)
    }

    pub fn add_plugin_state_listener(
        &self,
        listener: impl Fn(&PluginStateChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.events.add_plugin_state_listener(listener)
    }

    pub fn remove_plugin_state_listener(&self, id: ListenerId) -> bool {
        self.core.events.remove_plugin_state_listener(id)
    }

    pub fn add_service_listener(
        &self,
        listener: impl Fn(&ServiceChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.events.add_service_listener(listener)
    }

    pub fn remove_service_listener(&self, id: ListenerId) -> bool {
        self.core.events.remove_service_listener(id)
    }

    pub fn add_extension_listener(
        &self,
        listener: impl Fn(&ExtensionChanged) -> ListenerResult + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.events.add_extension_listener(listener)
    }

    pub fn remove_extension_listener(&self, id: ListenerId) -> bool {
        self.core.events.remove_extension_listener(id)
    }
}

impl Drop for Framework {
    fn drop(&mut self) {
        if self.state() == FrameworkState::Started {
            warn!("Framework dropped while started; stopping plugins");
            self.stop();
        }
    }
}

/// Builder for a [`Framework`] with plugins declared in code.
pub struct FrameworkBuilder {
    config: RuntimeConfig,
    modules: ModuleRegistry,
    plugins: Vec<PluginConfiguration>,
}

impl Default for FrameworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameworkBuilder {
    /// Defaults from [`RuntimeConfig`], without any plugins directory.
    pub fn new() -> Self {
        Self {
            config: RuntimeConfig {
                plugin_dirs: Vec::new(),
                ..RuntimeConfig::default()
            },
            modules: ModuleRegistry::new(),
            plugins: Vec::new(),
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn start_level(mut self, level: i32) -> Self {
        self.config.start_level = level;
        self
    }

    pub fn plugin_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.config.plugin_dirs.push(directory.into());
        self
    }

    pub fn policy(mut self, policy: StarterPolicy) -> Self {
        self.config.dependency_failure = policy.dependency_failure;
        self.config.stop_order = policy.stop_order;
        self
    }

    pub fn modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Adds a plugin installed before discovery runs.
    pub fn plugin(mut self, configuration: PluginConfiguration) -> Self {
        self.plugins.push(configuration);
        self
    }

    pub fn build(self) -> Result<Framework> {
        let framework = Framework::new(self.config, self.modules);
        for configuration in self.plugins {
            if let Err(e) = framework.install_configuration(configuration) {
                error!("Failed to install plugin declared in code: {}", e);
                return Err(e);
            }
        }
        Ok(framework)
    }
}
