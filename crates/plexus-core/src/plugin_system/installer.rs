//! # Plexus Core Plugin Installer
//!
//! Discovers plugin directories and turns their descriptors into installed
//! [`Plugin`]s.
//!
//! A plugin directory is any first-level subdirectory of a configured
//! plugins directory that contains a `plugin.json`. Subdirectories are
//! visited in name order so discovery is reproducible. A broken descriptor
//! or a duplicate id only excludes that one plugin.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use log::{debug, error, info, warn};
use tokio::fs;

use crate::event::PluginStateChanged;
use crate::kernel::FrameworkCore;
use crate::kernel::constants::DESCRIPTOR_FILE_NAME;
use crate::kernel::error::{Error, Result};
use crate::plugin_system::configuration::PluginConfiguration;
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::loader::ModuleRegistry;
use crate::plugin_system::plugin::Plugin;
use crate::plugin_system::state::PluginState;

#[derive(Default)]
struct InstalledPlugins {
    order: Vec<String>,
    by_id: HashMap<String, Arc<Plugin>>,
}

pub struct PluginInstaller {
    directories: Vec<PathBuf>,
    core: Weak<FrameworkCore>,
    modules: Arc<ModuleRegistry>,
    plugins: RwLock<InstalledPlugins>,
}

impl PluginInstaller {
    pub(crate) fn new(directories: Vec<PathBuf>, core: Weak<FrameworkCore>, modules: Arc<ModuleRegistry>) -> Self {
        Self {
            directories,
            core,
            modules,
            plugins: RwLock::new(InstalledPlugins::default()),
        }
    }

    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Scans every configured directory and installs what it finds.
    ///
    /// Returns the plugins installed by this call, in discovery order.
    pub async fn install_plugins(&self) -> Vec<Arc<Plugin>> {
        let mut installed = Vec::new();
        for root in &self.directories {
            for directory in Self::plugin_directories(root).await {
                match self.install_directory(&directory).await {
                    Ok(Some(plugin)) => installed.push(plugin),
                    Ok(None) => debug!("No {} in {}", DESCRIPTOR_FILE_NAME, directory.display()),
                    Err(e) => error!("Skipping plugin in {}: {}", directory.display(), e),
                }
            }
        }
        info!("Discovered {} plugins", installed.len());
        installed
    }

    /// Sorted first-level subdirectories of `root`. A missing root yields nothing.
    async fn plugin_directories(root: &Path) -> Vec<PathBuf> {
        let mut entries = match fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Cannot scan plugins directory {}: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut directories = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                    if is_dir {
                        directories.push(entry.path());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Error while scanning {}: {}", root.display(), e);
                    break;
                }
            }
        }
        directories.sort();
        directories
    }

    /// Installs the plugin in `directory` after startup and adds it to the resolver.
    ///
    /// `Ok(None)` means the directory holds no descriptor.
    pub async fn install_plugin(&self, directory: &Path) -> Result<Option<Arc<Plugin>>> {
        let plugin = self.install_directory(directory).await?;
        if let Some(plugin) = &plugin {
            self.add_to_resolver(plugin);
        }
        Ok(plugin)
    }

    /// Installs a plugin declared in code and adds it to the resolver.
    pub fn install_configuration(&self, configuration: PluginConfiguration) -> Result<Arc<Plugin>> {
        let plugin = self.register(configuration)?;
        self.add_to_resolver(&plugin);
        Ok(plugin)
    }

    fn add_to_resolver(&self, plugin: &Plugin) {
        if let Some(core) = self.core.upgrade() {
            core.resolver().add(plugin.configuration());
        }
    }

    async fn install_directory(&self, directory: &Path) -> Result<Option<Arc<Plugin>>> {
        let descriptor = directory.join(DESCRIPTOR_FILE_NAME);
        match fs::try_exists(&descriptor).await {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(source) => {
                return Err(Error::Io {
                    operation: "check plugin descriptor",
                    path: descriptor,
                    source,
                });
            }
        }

        let content = fs::read_to_string(&descriptor).await.map_err(|source| Error::Io {
            operation: "read plugin descriptor",
            path: descriptor.clone(),
            source,
        })?;
        let configuration = PluginConfiguration::from_json_str(&content, &descriptor)?;
        self.register(configuration).map(Some)
    }

    /// Creates the plugin unless its id is taken, then announces it as INSTALLED.
    fn register(&self, configuration: PluginConfiguration) -> Result<Arc<Plugin>> {
        let plugin = {
            let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = plugins.by_id.get(configuration.id()) {
                return Err(PluginSystemError::DuplicatePlugin {
                    plugin_id: configuration.id().to_string(),
                    existing: existing.configuration().directory().to_path_buf(),
                }
                .into());
            }
            let plugin = Plugin::new(configuration, self.core.clone(), Arc::clone(&self.modules));
            plugins.order.push(plugin.id().to_string());
            plugins.by_id.insert(plugin.id().to_string(), Arc::clone(&plugin));
            plugin
        };

        info!("Installed plugin {} {}", plugin.id(), plugin.version());
        if let Some(core) = self.core.upgrade() {
            core.events.fire_plugin_state_changed(PluginStateChanged {
                plugin_id: plugin.id().to_string(),
                previous: None,
                current: PluginState::Installed,
            });
        }
        Ok(plugin)
    }

    pub fn get_plugin(&self, id: &str) -> Option<Arc<Plugin>> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(id)
            .cloned()
    }

    /// Installed plugins in installation order.
    pub fn get_plugins(&self) -> Vec<Arc<Plugin>> {
        let plugins = self.plugins.read().unwrap_or_else(PoisonError::into_inner);
        plugins
            .order
            .iter()
            .filter_map(|id| plugins.by_id.get(id).cloned())
            .collect()
    }

    /// Forgets a plugin so its id can be installed again.
    pub fn remove(&self, id: &str) -> Option<Arc<Plugin>> {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        let removed = plugins.by_id.remove(id)?;
        plugins.order.retain(|known| known != id);
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.plugins.read().unwrap_or_else(PoisonError::into_inner).order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dispose(&self) {
        let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
        plugins.order.clear();
        plugins.by_id.clear();
    }
}

impl std::fmt::Debug for PluginInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstaller")
            .field("directories", &self.directories)
            .field("plugins", &self.len())
            .finish_non_exhaustive()
    }
}
