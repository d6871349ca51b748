//! # Plexus Core Module Registry
//!
//! Plugins do not load code from disk. Instead every piece of code a plugin
//! descriptor can refer to (its activator, the components behind declared
//! services, anything fetched through `load_class`) is registered up front
//! in a [`ModuleRegistry`] under `(plugin id, module path)`.
//!
//! Each [`Plugin`](super::Plugin) receives a [`CodeLoader`] bound to its id.
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, error};

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::traits::Activator;

/// Shared, type-erased component instance.
pub type Component = Arc<dyn Any + Send + Sync>;

pub type ActivatorFactory = Arc<dyn Fn() -> Box<dyn Activator> + Send + Sync>;
pub type ComponentFactory = Arc<dyn Fn() -> Component + Send + Sync>;

type ModuleKey = (String, String);

/// Factories for activators and components, keyed by plugin id and module path.
#[derive(Default, Clone)]
pub struct ModuleRegistry {
    activators: HashMap<ModuleKey, ActivatorFactory>,
    components: HashMap<ModuleKey, ComponentFactory>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an activator. A later registration for the same key replaces the earlier one.
    pub fn register_activator<F, A>(&mut self, plugin_id: &str, path: &str, factory: F) -> &mut Self
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Activator + 'static,
    {
        let factory: ActivatorFactory = Arc::new(move || Box::new(factory()) as Box<dyn Activator>);
        self.activators
            .insert((plugin_id.to_string(), path.to_string()), factory);
        self
    }

    /// Registers a component factory.
    pub fn register_component<F, T>(&mut self, plugin_id: &str, path: &str, factory: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        let factory: ComponentFactory = Arc::new(move || Arc::new(factory()) as Component);
        self.components
            .insert((plugin_id.to_string(), path.to_string()), factory);
        self
    }

    /// Merges another registry into this one.
    pub fn extend(&mut self, other: ModuleRegistry) -> &mut Self {
        self.activators.extend(other.activators);
        self.components.extend(other.components);
        self
    }

    pub fn activator(&self, plugin_id: &str, path: &str) -> Option<ActivatorFactory> {
        self.activators
            .get(&(plugin_id.to_string(), path.to_string()))
            .cloned()
    }

    pub fn component(&self, plugin_id: &str, path: &str) -> Option<ComponentFactory> {
        self.components
            .get(&(plugin_id.to_string(), path.to_string()))
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.activators.is_empty() && self.components.is_empty()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("activators", &self.activators.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Per-plugin view of the [`ModuleRegistry`].
#[derive(Debug, Clone)]
pub struct CodeLoader {
    plugin_id: String,
    modules: Arc<ModuleRegistry>,
}

impl CodeLoader {
    pub fn new(plugin_id: impl Into<String>, modules: Arc<ModuleRegistry>) -> Self {
        Self {
            plugin_id: plugin_id.into(),
            modules,
        }
    }

    /// Runs a factory, turning a panic into [`PluginSystemError::ModuleFailed`].
    fn instantiate<T>(&self, path: &str, factory: impl FnOnce() -> T) -> Result<T, PluginSystemError> {
        panic::catch_unwind(AssertUnwindSafe(factory)).map_err(|payload| {
            let message = panic_message(payload);
            error!("Module {} of plugin {} panicked: {}", path, self.plugin_id, message);
            PluginSystemError::ModuleFailed {
                plugin_id: self.plugin_id.clone(),
                path: path.to_string(),
                message,
            }
        })
    }

    /// Instantiates a registered component. Missing modules are logged and yield `None`.
    pub fn load(&self, path: &str) -> Result<Option<Component>, PluginSystemError> {
        match self.modules.component(&self.plugin_id, path) {
            Some(factory) => {
                let component = self.instantiate(path, || factory())?;
                debug!("Loaded component {} of plugin {}", path, self.plugin_id);
                Ok(Some(component))
            }
            None => {
                error!("Plugin {} has no component registered at {}", self.plugin_id, path);
                Ok(None)
            }
        }
    }

    /// Instantiates a registered activator, `None` if nothing is registered at `path`.
    pub fn load_activator(&self, path: &str) -> Result<Option<Box<dyn Activator>>, PluginSystemError> {
        match self.modules.activator(&self.plugin_id, path) {
            Some(factory) => self.instantiate(path, || factory()).map(Some),
            None => Ok(None),
        }
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
