use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::event::{EventManager, ServiceAction, ServiceChanged};
use crate::kernel::error::{Error, Result};
use crate::plugin_system::loader::Component;
use crate::service::{Properties, ServiceOwner, ServiceRegistration};

/// Name-indexed service registry. Every change is reported through the [`EventManager`].
#[derive(Debug)]
pub struct ServiceManager {
    services: RwLock<HashMap<String, Vec<Arc<ServiceRegistration>>>>,
    next_id: AtomicU64,
    events: Arc<EventManager>,
}

impl ServiceManager {
    pub fn new(events: Arc<EventManager>) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Publishes `instance` under `name`.
    pub fn add(
        &self,
        name: &str,
        instance: Component,
        owner: ServiceOwner,
        properties: Properties,
    ) -> Result<Arc<ServiceRegistration>> {
        if name.trim().is_empty() {
            return Err(Error::InvalidArgument("service name must not be empty".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registration = Arc::new(ServiceRegistration::new(id, name.to_string(), instance, owner, properties));
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_default()
            .push(Arc::clone(&registration));

        debug!("Service {} registered with id {}", name, id);
        self.events.fire_service_changed(ServiceChanged {
            service_name: name.to_string(),
            action: ServiceAction::Add,
        });
        Ok(registration)
    }

    /// Registrations under `name` that match `filter`, in registration order.
    pub fn find_services(&self, name: &str, filter: Option<&Properties>) -> Vec<Arc<ServiceRegistration>> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|registrations| {
                registrations
                    .iter()
                    .filter(|registration| registration.matches(filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// First matching registration's instance.
    pub fn find_default_service(&self, name: &str, filter: Option<&Properties>) -> Option<Component> {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .iter()
            .find(|registration| registration.matches(filter))
            .map(|registration| registration.instance())
    }

    /// Removes one registration. Returns false if it was not registered.
    pub fn remove(&self, registration: &ServiceRegistration) -> bool {
        let removed = {
            let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
            let Some(registrations) = services.get_mut(registration.name()) else {
                return false;
            };
            let before = registrations.len();
            registrations.retain(|candidate| candidate.id() != registration.id());
            let removed = registrations.len() != before;
            if registrations.is_empty() {
                services.remove(registration.name());
            }
            removed
        };

        if removed {
            self.events.fire_service_changed(ServiceChanged {
                service_name: registration.name().to_string(),
                action: ServiceAction::Remove,
            });
        }
        removed
    }

    /// Removes every registration made by `owner`, returning how many were removed.
    pub fn remove_by_owner(&self, owner: &ServiceOwner) -> usize {
        let removed: Vec<Arc<ServiceRegistration>> = {
            let mut services = self.services.write().unwrap_or_else(PoisonError::into_inner);
            let mut removed = Vec::new();
            for registrations in services.values_mut() {
                let (owned, kept): (Vec<_>, Vec<_>) = registrations
                    .drain(..)
                    .partition(|registration| registration.owner() == owner);
                *registrations = kept;
                removed.extend(owned);
            }
            services.retain(|_, registrations| !registrations.is_empty());
            removed
        };

        for registration in &removed {
            self.events.fire_service_changed(ServiceChanged {
                service_name: registration.name().to_string(),
                action: ServiceAction::Remove,
            });
        }
        removed.len()
    }

    pub fn len(&self) -> usize {
        self.services
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every registration without firing events.
    pub fn dispose(&self) {
        self.services
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
