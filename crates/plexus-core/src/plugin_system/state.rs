use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Plugin`](super::Plugin).
///
/// `Uninstalled` is terminal: once reached, every lifecycle call is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Installed,
    Resolved,
    Starting,
    Active,
    Stopping,
    Uninstalled,
}

impl PluginState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginState::Installed => "installed",
            PluginState::Resolved => "resolved",
            PluginState::Starting => "starting",
            PluginState::Active => "active",
            PluginState::Stopping => "stopping",
            PluginState::Uninstalled => "uninstalled",
        }
    }

    pub fn is_transitional(&self) -> bool {
        matches!(self, PluginState::Starting | PluginState::Stopping)
    }
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution tag carried by metadata nodes and their constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveState {
    Resolvable,
    ResolveFailed,
    ResolveSuccess,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResolveState::Resolvable => "resolvable",
            ResolveState::ResolveFailed => "resolve-failed",
            ResolveState::ResolveSuccess => "resolve-success",
        };
        f.write_str(label)
    }
}

/// The state a plugin's descriptor asks the starter to bring it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialState {
    Installed,
    #[default]
    Active,
}

impl InitialState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "installed" => Some(InitialState::Installed),
            "active" => Some(InitialState::Active),
            _ => None,
        }
    }
}
