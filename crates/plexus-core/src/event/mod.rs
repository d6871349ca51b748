//! # Plexus Core Event System
//!
//! Change notifications for the framework state, plugin states, the service
//! registry and the extension registry.
//!
//! Listeners are plain closures registered on the [`EventManager`]. Each
//! registration returns a [`ListenerId`] used to remove it again. A listener
//! that fails or panics is logged and never affects the other listeners or
//! the code that fired the event.
pub mod dispatcher;
pub mod manager;
pub mod types;

use std::fmt;
use std::sync::Arc;

pub use dispatcher::ListenerSet;
pub use manager::EventManager;
pub use types::{
    ExtensionAction, ExtensionChanged, FrameworkStateChanged, PluginStateChanged, ServiceAction,
    ServiceChanged,
};

/// Identifier handed out for every listener registration.
pub type ListenerId = u64;

/// What a listener reports back. Errors are logged by the dispatcher.
pub type ListenerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// A registered listener for events of type `E`.
pub type Listener<E> = Arc<dyn Fn(&E) -> ListenerResult + Send + Sync>;

/// Common behaviour of every event type.
pub trait Event: fmt::Debug + Send + Sync + 'static {
    /// Stable event name used in logs.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests;
