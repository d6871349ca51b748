//! # Plexus Core Plugin System Errors
//!
//! [`PluginSystemError`] covers the failures a plugin can run into between
//! discovery and shutdown:
//!
//! - configuration errors from malformed descriptors or duplicate ids,
//! - resolution failures surfaced when an unresolved plugin is used,
//! - start failures (start level, activator, declared components),
//! - lifecycle rejections (uninstalled, non-stoppable, busy).
use std::path::PathBuf;

use crate::plugin_system::state::PluginState;
use crate::plugin_system::version::VersionError;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin descriptor error for '{}': {message}", path.display())]
    Descriptor {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Plugin '{plugin_id}' is already installed from '{}'", existing.display())]
    DuplicatePlugin { plugin_id: String, existing: PathBuf },

    #[error("Plugin '{plugin_id}' cannot {action}: it is not resolved ({})", if causes.is_empty() { "unknown to the resolver".to_string() } else { causes.join("; ") })]
    Unresolved {
        plugin_id: String,
        action: String,
        causes: Vec<String>,
    },

    #[error("Plugin '{plugin_id}' cannot {action}: it has been uninstalled")]
    Uninstalled { plugin_id: String, action: String },

    #[error("Plugin '{plugin_id}' start level {plugin_level} is bigger than the framework start level {framework_level}")]
    StartLevelExceeded {
        plugin_id: String,
        plugin_level: i32,
        framework_level: i32,
    },

    #[error("Plugin '{plugin_id}' is not stoppable while the framework is running")]
    NotStoppable { plugin_id: String },

    #[error("Plugin '{plugin_id}' is {state}; wait for the transition to finish")]
    TransitionInProgress { plugin_id: String, state: PluginState },

    #[error("Activator '{path}' of plugin '{plugin_id}' is not registered")]
    ActivatorNotFound { plugin_id: String, path: String },

    #[error("Activator of plugin '{plugin_id}' failed during {phase}: {message}")]
    ActivatorFailed {
        plugin_id: String,
        phase: &'static str,
        message: String,
    },

    #[error("Component '{path}' of plugin '{plugin_id}' is not registered")]
    ComponentNotFound { plugin_id: String, path: String },

    #[error("Module '{path}' of plugin '{plugin_id}' panicked while loading: {message}")]
    ModuleFailed {
        plugin_id: String,
        path: String,
        message: String,
    },

    #[error("The context of plugin '{plugin_id}' has been disposed")]
    ContextDisposed { plugin_id: String },

    #[error("The framework owning plugin '{plugin_id}' is no longer available")]
    FrameworkUnavailable { plugin_id: String },

    #[error("Version parsing error: {0}")]
    Version(#[from] VersionError),
}
