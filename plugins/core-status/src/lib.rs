//! Core status plugin.
//!
//! While active it keeps a [`StatusBoard`] of every plugin's lifecycle state,
//! publishes it as the `plexus.status` service and logs each state change.
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info};
use plexus_core::kernel::constants::DEFAULT_ACTIVATOR_PATH;
use plexus_core::service::Properties;
use plexus_core::{Activator, ActivatorResult, ModuleRegistry, PluginContext, PluginState};
use serde::Serialize;

pub const PLUGIN_ID: &str = "core-status";
pub const SERVICE_NAME: &str = "plexus.status";

/// One row of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub id: String,
    pub state: PluginState,
}

/// Last known state of every plugin, ordered by id.
#[derive(Debug, Default)]
pub struct StatusBoard {
    states: Mutex<BTreeMap<String, PluginState>>,
}

impl StatusBoard {
    pub fn record(&self, plugin_id: &str, state: PluginState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(plugin_id.to_string(), state);
    }

    pub fn state(&self, plugin_id: &str) -> Option<PluginState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(plugin_id)
            .copied()
    }

    pub fn entries(&self) -> Vec<StatusEntry> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, state)| StatusEntry {
                id: id.clone(),
                state: *state,
            })
            .collect()
    }

    /// Number of plugins currently ACTIVE.
    pub fn active_count(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|state| **state == PluginState::Active)
            .count()
    }

    /// `id: state` lines.
    pub fn render(&self) -> String {
        self.entries()
            .iter()
            .map(|entry| format!("{}: {}", entry.id, entry.state))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.entries())
    }
}

#[derive(Default)]
pub struct StatusActivator {
    board: Mutex<Option<Arc<StatusBoard>>>,
}

impl Activator for StatusActivator {
    fn start(&self, context: &PluginContext) -> ActivatorResult {
        let board = Arc::new(StatusBoard::default());
        for plugin in context.get_plugins() {
            board.record(plugin.id(), plugin.state());
        }

        let listener_board = Arc::clone(&board);
        context.add_plugin_state_listener(move |event| {
            info!("Plugin {} is now {}", event.plugin_id, event.current);
            listener_board.record(&event.plugin_id, event.current);
            Ok(())
        })?;

        let mut properties = Properties::new();
        properties.insert("format".to_string(), serde_json::Value::from("text"));
        context.add_service(SERVICE_NAME, board.clone(), properties)?;

        debug!("Status board tracking {} plugins", board.entries().len());
        *self.board.lock().unwrap_or_else(PoisonError::into_inner) = Some(board);
        Ok(())
    }

    fn stop(&self, _context: &PluginContext) -> ActivatorResult {
        if let Some(board) = self.board.lock().unwrap_or_else(PoisonError::into_inner).take() {
            info!("Status board closed with {} active plugins", board.active_count());
        }
        Ok(())
    }
}

/// Registers this plugin's code with the host.
pub fn register(modules: &mut ModuleRegistry) {
    modules.register_activator(PLUGIN_ID, DEFAULT_ACTIVATOR_PATH, StatusActivator::default);
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_core::{Framework, PluginConfiguration, Version};

    fn framework() -> Framework {
        let mut modules = ModuleRegistry::new();
        register(&mut modules);
        Framework::builder()
            .modules(modules)
            .plugin(PluginConfiguration::builder(PLUGIN_ID).start_level(1).build())
            .plugin(
                PluginConfiguration::builder("app")
                    .depends_on(PLUGIN_ID, Version::new(0, 0, 0))
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_board_follows_plugin_states() {
        let framework = framework();
        framework.start().await.unwrap();

        let board = framework
            .get_default_service(SERVICE_NAME, None)
            .and_then(|service| service.downcast::<StatusBoard>().ok())
            .expect("status service registered");
        assert_eq!(board.state(PLUGIN_ID), Some(PluginState::Active));
        assert_eq!(board.state("app"), Some(PluginState::Active));
        assert_eq!(board.active_count(), 2);
        assert_eq!(board.render(), "app: active\ncore-status: active");

        framework.get_plugin("app").unwrap().stop().unwrap();
        assert_eq!(board.state("app"), Some(PluginState::Resolved));
        assert!(board.to_json().unwrap().contains(r#"{"id":"app","state":"resolved"}"#));
    }

    #[tokio::test]
    async fn test_service_goes_away_on_stop() {
        let framework = framework();
        framework.start().await.unwrap();
        framework.get_plugin(PLUGIN_ID).unwrap().stop().unwrap();
        assert!(framework.get_services(SERVICE_NAME, None).is_empty());
    }
}
