use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::event::{EventManager, ExtensionAction, ExtensionChanged};

/// One contribution to an extension point.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    id: String,
    data: Value,
    owner: String,
}

impl Extension {
    pub fn new(id: impl Into<String>, data: Value, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data,
            owner: owner.into(),
        }
    }

    /// Extension-point id this contribution belongs to.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Id of the contributing plugin.
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

#[derive(Debug)]
pub struct ExtensionManager {
    extensions: RwLock<HashMap<String, Vec<Arc<Extension>>>>,
    events: Arc<EventManager>,
}

impl ExtensionManager {
    pub fn new(events: Arc<EventManager>) -> Self {
        Self {
            extensions: RwLock::new(HashMap::new()),
            events,
        }
    }

    pub fn add(&self, extension: Extension) -> Arc<Extension> {
        let extension = Arc::new(extension);
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(extension.id().to_string())
            .or_default()
            .push(Arc::clone(&extension));
        self.events.fire_extension_changed(ExtensionChanged {
            extension: Arc::clone(&extension),
            action: ExtensionAction::Add,
        });
        extension
    }

    /// Removes this exact contribution (by identity, not by value).
    pub fn remove(&self, extension: &Arc<Extension>) -> bool {
        let removed = {
            let mut extensions = self.extensions.write().unwrap_or_else(PoisonError::into_inner);
            match extensions.get_mut(extension.id()) {
                Some(contributions) => {
                    let before = contributions.len();
                    contributions.retain(|candidate| !Arc::ptr_eq(candidate, extension));
                    let removed = contributions.len() != before;
                    if contributions.is_empty() {
                        extensions.remove(extension.id());
                    }
                    removed
                }
                None => false,
            }
        };
        if removed {
            self.events.fire_extension_changed(ExtensionChanged {
                extension: Arc::clone(extension),
                action: ExtensionAction::Remove,
            });
        }
        removed
    }

    /// Removes every contribution of plugin `owner`.
    pub fn remove_by_owner(&self, owner: &str) -> usize {
        let removed: Vec<Arc<Extension>> = {
            let mut extensions = self.extensions.write().unwrap_or_else(PoisonError::into_inner);
            let mut removed = Vec::new();
            for contributions in extensions.values_mut() {
                let (owned, kept): (Vec<_>, Vec<_>) = contributions
                    .drain(..)
                    .partition(|extension| extension.owner() == owner);
                *contributions = kept;
                removed.extend(owned);
            }
            extensions.retain(|_, contributions| !contributions.is_empty());
            removed
        };
        for extension in &removed {
            self.events.fire_extension_changed(ExtensionChanged {
                extension: Arc::clone(extension),
                action: ExtensionAction::Remove,
            });
        }
        removed.len()
    }

    /// Contributions to extension point `id`, in registration order.
    pub fn find(&self, id: &str) -> Vec<Arc<Extension>> {
        self.extensions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn dispose(&self) {
        self.extensions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
