use std::fmt;
use std::sync::Arc;

use crate::event::Event;
use crate::extension::Extension;
use crate::kernel::FrameworkState;
use crate::plugin_system::PluginState;

/// Whether a registry entry was added or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionAction {
    Add,
    Remove,
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceAction::Add => "add",
            ServiceAction::Remove => "remove",
        })
    }
}

impl fmt::Display for ExtensionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtensionAction::Add => "add",
            ExtensionAction::Remove => "remove",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkStateChanged {
    pub previous: FrameworkState,
    pub current: FrameworkState,
}

/// `previous` is `None` for the installation event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStateChanged {
    pub plugin_id: String,
    pub previous: Option<PluginState>,
    pub current: PluginState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceChanged {
    pub service_name: String,
    pub action: ServiceAction,
}

#[derive(Debug, Clone)]
pub struct ExtensionChanged {
    pub extension: Arc<Extension>,
    pub action: ExtensionAction,
}

impl Event for FrameworkStateChanged {
    fn name(&self) -> &'static str {
        "framework.state"
    }
}

impl Event for PluginStateChanged {
    fn name(&self) -> &'static str {
        "plugin.state"
    }
}

impl Event for ServiceChanged {
    fn name(&self) -> &'static str {
        "service.changed"
    }
}

impl Event for ExtensionChanged {
    fn name(&self) -> &'static str {
        "extension.changed"
    }
}
