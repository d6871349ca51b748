//! # Plexus Core
//!
//! In-process plugin runtime: discovers plugin directories, resolves their
//! version-constrained dependencies (cycles included), and drives every plugin
//! through its lifecycle in start-level and dependency order.
//!
//! ## Modules
//!
//! - [`kernel`]: the [`Framework`] orchestrator, its state machine and the
//!   runtime-wide error type.
//! - [`plugin_system`]: versions, dependency resolution, the per-plugin state
//!   machine, the starter, discovery and code registration.
//! - [`event`]: lifecycle and registry change notifications.
//! - [`service`]: attribute-matched service registry.
//! - [`extension`]: extension-point contributions.
//! - [`config`]: runtime configuration files.
pub mod config;
pub mod event;
pub mod extension;
pub mod kernel;
pub mod plugin_system;
pub mod service;

#[cfg(test)]
mod tests;

pub use kernel::error::{Error as KernelError, Result as KernelResult};
pub use kernel::{Framework, FrameworkBuilder, FrameworkState};
pub use plugin_system::{
    Activator, ActivatorResult, ModuleRegistry, Plugin, PluginConfiguration, PluginContext,
    PluginState, Version,
};
