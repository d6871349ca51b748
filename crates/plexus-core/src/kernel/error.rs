//! # Plexus Core Kernel Errors
//!
//! [`Error`] is the error type returned across the runtime's public API. It
//! wraps the plugin-system and configuration errors and adds the few
//! failures owned by the kernel itself.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::config::ConfigError;
use crate::kernel::state::FrameworkState;
use crate::plugin_system::error::PluginSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed plugin system error
    #[error("Plugin system error: {0}")]
    PluginSystem(#[from] PluginSystemError),

    /// Runtime configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation was attempted in a framework state that does not allow it
    #[error("Cannot {operation} while the framework is {state}")]
    InvalidState {
        operation: &'static str,
        state: FrameworkState,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error during '{operation}' on '{}': {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// The wrapped plugin system error, if any.
    pub fn as_plugin_error(&self) -> Option<&PluginSystemError> {
        match self {
            Error::PluginSystem(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for kernel operations
pub type Result<T> = StdResult<T, Error>;
