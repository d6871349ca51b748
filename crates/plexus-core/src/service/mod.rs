//! # Plexus Core Service Registry
//!
//! Plugins (and the framework itself) publish shared objects under a name
//! together with a property map. Consumers look them up by name and an
//! optional property filter.
pub mod manager;
pub mod registration;

use std::collections::HashMap;

pub use manager::ServiceManager;
pub use registration::{ServiceOwner, ServiceRegistration};

/// Properties attached to a service registration.
pub type Properties = HashMap<String, serde_json::Value>;
