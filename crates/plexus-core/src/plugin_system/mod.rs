//! # Plexus Core Plugin System
//!
//! Everything between finding a plugin on disk and stopping it again.
//!
//! ## Key Components:
//!
//! - **Versions & constraints**: [`Version`], [`DependencyConstraint`] and the
//!   resolution node [`PluginMetadata`].
//! - **Resolution**: [`PluginResolver`], the fixpoint constraint solver over
//!   the plugin graph, with incremental add and remove.
//! - **Lifecycle**: [`Plugin`] (per-plugin state machine) and
//!   [`PluginContext`] (the handle a started plugin works through).
//! - **Ordering**: [`PluginStarter`], start-level and dependency aware.
//! - **Discovery**: [`PluginInstaller`] and the descriptor model
//!   [`PluginConfiguration`].
//! - **Code**: [`ModuleRegistry`] and [`CodeLoader`], which replace loading
//!   code from disk with factories registered ahead of time, and the
//!   [`Activator`] trait.
//! - **Errors**: [`PluginSystemError`](error::PluginSystemError).
pub mod configuration;
pub mod context;
pub mod dependency;
pub mod error;
pub mod installer;
pub mod loader;
pub mod metadata;
pub mod plugin;
pub mod resolver;
pub mod starter;
pub mod state;
pub mod traits;
pub mod version;

pub use configuration::{
    ConfigurationBuilder, DependencyDescriptor, ExtensionDescriptor, PluginConfiguration, ServiceDescriptor,
};
pub use context::PluginContext;
pub use dependency::{ConstraintFailure, DependencyConstraint};
pub use error::PluginSystemError;
pub use installer::PluginInstaller;
pub use loader::{CodeLoader, Component, ModuleRegistry};
pub use metadata::PluginMetadata;
pub use plugin::Plugin;
pub use resolver::PluginResolver;
pub use starter::{DependencyFailurePolicy, PluginStarter, StartReport, StarterPolicy, StopOrder};
pub use state::{InitialState, PluginState, ResolveState};
pub use traits::{Activator, ActivatorResult};
pub use version::{Version, VersionError};
