use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::plugin_system::loader::Component;
use crate::service::Properties;

/// Who registered a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceOwner {
    Framework,
    Plugin(String),
}

/// A published service instance with its properties.
pub struct ServiceRegistration {
    id: u64,
    name: String,
    instance: Component,
    owner: ServiceOwner,
    properties: Properties,
}

impl ServiceRegistration {
    pub(crate) fn new(id: u64, name: String, instance: Component, owner: ServiceOwner, properties: Properties) -> Self {
        Self {
            id,
            name,
            instance,
            owner,
            properties,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &ServiceOwner {
        &self.owner
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn instance(&self) -> Component {
        Arc::clone(&self.instance)
    }

    /// Downcasts the instance to its concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.instance).downcast::<T>().ok()
    }

    /// `None` matches every registration; otherwise every filter entry must be present and equal.
    pub fn matches(&self, filter: Option<&Properties>) -> bool {
        match filter {
            None => true,
            Some(filter) => filter
                .iter()
                .all(|(key, expected)| self.properties.get(key) == Some(expected)),
        }
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}
