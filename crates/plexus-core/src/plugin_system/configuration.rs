//! # Plexus Core Plugin Configuration
//!
//! [`PluginConfiguration`] is the validated form of a plugin descriptor
//! (`plugin.json`). It is produced either by [`PluginConfiguration::from_json_str`]
//! during discovery or by [`ConfigurationBuilder`] for plugins declared in code.
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::kernel::constants::{DEFAULT_ACTIVATOR_PATH, DEFAULT_PLUGIN_START_LEVEL, DEFAULT_VERSION};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::state::InitialState;
use crate::plugin_system::version::Version;
use crate::service::Properties;

/// A declared dependency: plugin `id` at `version` or newer.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyDescriptor {
    pub id: String,
    pub version: Version,
}

/// A service the plugin contributes on start, built from a registered component.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Module path of the component factory that produces the instance.
    pub component: String,
    pub properties: Properties,
}

/// An extension-point contribution registered on start.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDescriptor {
    pub id: String,
    pub data: Value,
}

/// Validated plugin descriptor.
#[derive(Debug, Clone)]
pub struct PluginConfiguration {
    id: String,
    name: String,
    description: String,
    version: Version,
    start_level: i32,
    initial_state: InitialState,
    stoppable: bool,
    activator: Option<String>,
    dependencies: Vec<DependencyDescriptor>,
    services: Vec<ServiceDescriptor>,
    extensions: Vec<ExtensionDescriptor>,
    directory: PathBuf,
}

// --- Raw descriptor as it appears on disk ---

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStartLevel {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
struct RawDependency {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

#[derive(Deserialize)]
struct RawService {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    properties: Option<serde_json::Map<String, Value>>,
}

#[derive(Deserialize)]
struct RawExtension {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDescriptor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    start_level: Option<RawStartLevel>,
    #[serde(default)]
    initialized_state: Option<String>,
    #[serde(default)]
    stoppable: Option<bool>,
    #[serde(default)]
    activator: Option<String>,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
    #[serde(default)]
    services: Vec<RawService>,
    #[serde(default)]
    extensions: Vec<RawExtension>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl PluginConfiguration {
    /// Starts a builder for a plugin declared in code.
    pub fn builder(id: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(id)
    }

    /// Parses and validates descriptor content read from `descriptor_path`.
    pub fn from_json_str(content: &str, descriptor_path: &Path) -> Result<Self, PluginSystemError> {
        let invalid = |message: String| PluginSystemError::Descriptor {
            path: descriptor_path.to_path_buf(),
            message,
            source: None,
        };

        let raw: RawDescriptor = serde_json::from_str(content).map_err(|e| PluginSystemError::Descriptor {
            path: descriptor_path.to_path_buf(),
            message: "failed to parse descriptor JSON".to_string(),
            source: Some(Box::new(e)),
        })?;

        let id = non_empty(raw.id).ok_or_else(|| invalid("the plugin id is required".to_string()))?;
        let name = non_empty(raw.name).unwrap_or_else(|| id.clone());
        let description = non_empty(raw.description).unwrap_or_else(|| name.clone());
        let version = Version::parse(raw.version.as_deref().unwrap_or(DEFAULT_VERSION)).map_err(|e| {
            PluginSystemError::Descriptor {
                path: descriptor_path.to_path_buf(),
                message: format!("invalid version for plugin {id}"),
                source: Some(Box::new(e)),
            }
        })?;

        let start_level = match raw.start_level {
            None => DEFAULT_PLUGIN_START_LEVEL,
            Some(RawStartLevel::Number(n)) => i32::try_from(n)
                .map_err(|_| invalid(format!("startLevel {n} of plugin {id} is out of range")))?,
            Some(RawStartLevel::Text(text)) => text
                .trim()
                .parse::<i32>()
                .map_err(|_| invalid(format!("startLevel '{text}' of plugin {id} is not an integer")))?,
        };

        let initial_state = match raw.initialized_state.as_deref().map(str::trim) {
            None | Some("") => InitialState::default(),
            Some(value) => InitialState::parse(value).ok_or_else(|| {
                invalid(format!(
                    "initializedState '{value}' of plugin {id} must be 'installed' or 'active'"
                ))
            })?,
        };

        let mut dependencies = Vec::with_capacity(raw.dependencies.len());
        for dep in raw.dependencies {
            let dep_id = non_empty(dep.id)
                .ok_or_else(|| invalid(format!("a dependency of plugin {id} has no id")))?;
            let dep_version = Version::parse(dep.version.as_deref().unwrap_or(DEFAULT_VERSION)).map_err(|e| {
                PluginSystemError::Descriptor {
                    path: descriptor_path.to_path_buf(),
                    message: format!("invalid version for dependency {dep_id} of plugin {id}"),
                    source: Some(Box::new(e)),
                }
            })?;
            dependencies.push(DependencyDescriptor { id: dep_id, version: dep_version });
        }

        let mut services = Vec::with_capacity(raw.services.len());
        for service in raw.services {
            let name = non_empty(service.name)
                .ok_or_else(|| invalid(format!("a service of plugin {id} has no name")))?;
            let component = non_empty(service.service)
                .ok_or_else(|| invalid(format!("service {name} of plugin {id} has no component")))?;
            let properties = service.properties.unwrap_or_default().into_iter().collect();
            services.push(ServiceDescriptor { name, component, properties });
        }

        let mut extensions = Vec::with_capacity(raw.extensions.len());
        for extension in raw.extensions {
            let ext_id = non_empty(extension.id)
                .ok_or_else(|| invalid(format!("an extension of plugin {id} has no id")))?;
            if extension.data.is_null() {
                return Err(invalid(format!("extension {ext_id} of plugin {id} has no data")));
            }
            extensions.push(ExtensionDescriptor { id: ext_id, data: extension.data });
        }

        let directory = descriptor_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(Self {
            id,
            name,
            description,
            version,
            start_level,
            initial_state,
            stoppable: raw.stoppable.unwrap_or(true),
            activator: non_empty(raw.activator),
            dependencies,
            services,
            extensions,
            directory,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn start_level(&self) -> i32 {
        self.start_level
    }

    pub fn initial_state(&self) -> InitialState {
        self.initial_state
    }

    pub fn stoppable(&self) -> bool {
        self.stoppable
    }

    /// Explicitly configured activator module path.
    pub fn activator(&self) -> Option<&str> {
        self.activator.as_deref()
    }

    /// Activator path to try when none is configured.
    pub fn default_activator(&self) -> &'static str {
        DEFAULT_ACTIVATOR_PATH
    }

    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.dependencies
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn extensions(&self) -> &[ExtensionDescriptor] {
        &self.extensions
    }

    /// Directory the plugin was discovered in; empty for plugins declared in code.
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Builder for [`PluginConfiguration`] with the same defaults as a descriptor.
pub struct ConfigurationBuilder {
    configuration: PluginConfiguration,
}

impl ConfigurationBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            configuration: PluginConfiguration {
                name: id.clone(),
                description: id.clone(),
                id,
                version: Version::default(),
                start_level: DEFAULT_PLUGIN_START_LEVEL,
                initial_state: InitialState::default(),
                stoppable: true,
                activator: None,
                dependencies: Vec::new(),
                services: Vec::new(),
                extensions: Vec::new(),
                directory: PathBuf::new(),
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.configuration.name = name.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.configuration.description = description.into();
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.configuration.version = version;
        self
    }

    pub fn start_level(mut self, level: i32) -> Self {
        self.configuration.start_level = level;
        self
    }

    pub fn initial_state(mut self, state: InitialState) -> Self {
        self.configuration.initial_state = state;
        self
    }

    pub fn stoppable(mut self, stoppable: bool) -> Self {
        self.configuration.stoppable = stoppable;
        self
    }

    pub fn activator(mut self, path: impl Into<String>) -> Self {
        self.configuration.activator = Some(path.into());
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>, version: Version) -> Self {
        self.configuration
            .dependencies
            .push(DependencyDescriptor { id: id.into(), version });
        self
    }

    pub fn service(mut self, name: impl Into<String>, component: impl Into<String>, properties: Properties) -> Self {
        self.configuration.services.push(ServiceDescriptor {
            name: name.into(),
            component: component.into(),
            properties,
        });
        self
    }

    pub fn extension(mut self, id: impl Into<String>, data: Value) -> Self {
        self.configuration
            .extensions
            .push(ExtensionDescriptor { id: id.into(), data });
        self
    }

    pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.configuration.directory = directory.into();
        self
    }

    pub fn build(self) -> PluginConfiguration {
        self.configuration
    }
}
