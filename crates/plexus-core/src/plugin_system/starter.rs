//! # Plexus Core Plugin Starter
//!
//! Starts installed plugins by start level, dependencies first, and stops
//! them again in reverse level order.
//!
//! Within a level plugins are ordered by id length, then by id, so the
//! order never depends on discovery order. A plugin that fails to start is
//! recorded and the sequence carries on with the next one.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::plugin_system::plugin::Plugin;
use crate::plugin_system::resolver::PluginResolver;
use crate::plugin_system::state::{InitialState, PluginState};

/// What happens to a plugin whose dependency failed to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyFailurePolicy {
    /// The dependent still attempts its own start.
    #[default]
    BestEffort,
    /// The dependent is recorded as failed without attempting a start.
    SkipDependents,
}

/// How plugins inside the reverse level order are stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopOrder {
    /// Only the start level decides; dependencies are not consulted.
    #[default]
    LevelOnly,
    /// Active dependents of a plugin are stopped before the plugin itself.
    DependentsFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StarterPolicy {
    pub dependency_failure: DependencyFailurePolicy,
    pub stop_order: StopOrder,
}

/// Outcome of [`PluginStarter::start_plugins`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    /// Plugins that became ACTIVE, in start order.
    pub started: Vec<String>,
    /// Plugins that could not be started, with the reason.
    pub failed: Vec<(String, String)>,
}

impl StartReport {
    pub fn is_failed(&self, id: &str) -> bool {
        self.failed.iter().any(|(failed, _)| failed == id)
    }
}

/// Bookkeeping for one start level.
struct StartRun<'a> {
    starting: HashSet<String>,
    failed: &'a mut HashMap<String, String>,
    report: &'a mut StartReport,
}

fn lock(resolver: &Mutex<PluginResolver>) -> MutexGuard<'_, PluginResolver> {
    resolver.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct PluginStarter {
    levels: BTreeMap<i32, Vec<Arc<Plugin>>>,
    by_id: HashMap<String, Arc<Plugin>>,
    policy: StarterPolicy,
}

impl PluginStarter {
    pub fn new(plugins: impl IntoIterator<Item = Arc<Plugin>>, policy: StarterPolicy) -> Self {
        let mut levels: BTreeMap<i32, Vec<Arc<Plugin>>> = BTreeMap::new();
        let mut by_id = HashMap::new();
        for plugin in plugins {
            by_id.insert(plugin.id().to_string(), Arc::clone(&plugin));
            levels
                .entry(plugin.configuration().start_level())
                .or_default()
                .push(plugin);
        }
        for plugins in levels.values_mut() {
            plugins.sort_by(|a, b| a.id().len().cmp(&b.id().len()).then_with(|| a.id().cmp(b.id())));
        }
        Self { levels, by_id, policy }
    }

    pub fn policy(&self) -> StarterPolicy {
        self.policy
    }

    /// Plugin ids per start level, ascending, in start order within each level.
    pub fn levels(&self) -> Vec<(i32, Vec<String>)> {
        self.levels
            .iter()
            .map(|(level, plugins)| (*level, plugins.iter().map(|p| p.id().to_string()).collect()))
            .collect()
    }

    /// Starts every plugin whose descriptor asks to be active.
    pub fn start_plugins(&self, resolver: &Mutex<PluginResolver>) -> StartReport {
        let mut report = StartReport::default();
        let mut failed = HashMap::new();

        for (level, plugins) in &self.levels {
            debug!("Starting plugins at level {}", level);
            let mut run = StartRun {
                starting: HashSet::new(),
                failed: &mut failed,
                report: &mut report,
            };
            for plugin in plugins {
                if plugin.configuration().initial_state() == InitialState::Active {
                    self.start_plugin(plugin, resolver, &mut run);
                }
            }
        }

        info!(
            "Plugin start finished: {} started, {} failed",
            report.started.len(),
            report.failed.len()
        );
        report
    }

    /// Starts the first-level dependencies of `plugin`, then `plugin` itself.
    fn start_plugin(&self, plugin: &Arc<Plugin>, resolver: &Mutex<PluginResolver>, run: &mut StartRun<'_>) {
        let id = plugin.id();
        if run.failed.contains_key(id) {
            return;
        }
        run.starting.insert(id.to_string());

        let dependencies: Vec<String> = lock(resolver)
            .dependencies(id)
            .map(<[String]>::to_vec)
            .unwrap_or_default();
        for dependency in &dependencies {
            if run.starting.contains(dependency) {
                continue;
            }
            match self.by_id.get(dependency) {
                Some(target) => self.start_plugin(target, resolver, run),
                None => warn!("Dependency {} of plugin {} is not installed", dependency, id),
            }
        }

        if self.policy.dependency_failure == DependencyFailurePolicy::SkipDependents {
            if let Some(dependency) = dependencies.iter().find(|dep| run.failed.contains_key(*dep)) {
                let reason = format!("dependency {dependency} failed to start");
                warn!("Not starting plugin {}: {}", id, reason);
                run.failed.insert(id.to_string(), reason.clone());
                run.report.failed.push((id.to_string(), reason));
                return;
            }
        }

        let was_active = plugin.state() == PluginState::Active;
        match plugin.start() {
            Ok(()) => {
                if !was_active && plugin.state() == PluginState::Active {
                    run.report.started.push(id.to_string());
                }
            }
            Err(e) => {
                error!("Plugin {} failed to start: {}", id, e);
                run.failed.insert(id.to_string(), e.to_string());
                run.report.failed.push((id.to_string(), e.to_string()));
            }
        }
    }

    /// Stops every plugin, highest start level first. Failures are logged.
    pub fn stop_plugins(&self, resolver: &Mutex<PluginResolver>) {
        let mut visited = HashSet::new();
        for (level, plugins) in self.levels.iter().rev() {
            debug!("Stopping plugins at level {}", level);
            for plugin in plugins {
                match self.policy.stop_order {
                    StopOrder::LevelOnly => Self::stop_plugin(plugin),
                    StopOrder::DependentsFirst => self.stop_with_dependents(plugin, resolver, &mut visited),
                }
            }
        }
    }

    /// Stops whatever is still ACTIVE among `plugins`, highest start level first.
    ///
    /// Covers plugins installed after the starter was built.
    pub fn stop_remaining(plugins: impl IntoIterator<Item = Arc<Plugin>>) {
        let mut remaining: Vec<Arc<Plugin>> = plugins
            .into_iter()
            .filter(|plugin| plugin.state() == PluginState::Active)
            .collect();
        remaining.sort_by(|a, b| stop_order(a, b));
        for plugin in &remaining {
            debug!("Stopping plugin {} installed after start", plugin.id());
            Self::stop_plugin(plugin);
        }
    }

    fn stop_plugin(plugin: &Plugin) {
        if plugin.state() == PluginState::Uninstalled {
            return;
        }
        if let Err(e) = plugin.stop() {
            warn!("Plugin {} could not be stopped: {}", plugin.id(), e);
        }
    }

    fn stop_with_dependents(&self, plugin: &Arc<Plugin>, resolver: &Mutex<PluginResolver>, visited: &mut HashSet<String>) {
        if !visited.insert(plugin.id().to_string()) {
            return;
        }

        let mut dependents: Vec<Arc<Plugin>> = {
            let resolver = lock(resolver);
            self.by_id
                .values()
                .filter(|candidate| candidate.id() != plugin.id() && candidate.state() == PluginState::Active)
                .filter(|candidate| {
                    resolver
                        .dependencies(candidate.id())
                        .is_some_and(|deps| deps.iter().any(|dep| dep == plugin.id()))
                })
                .cloned()
                .collect()
        };
        dependents.sort_by(|a, b| stop_order(a, b));

        for dependent in &dependents {
            self.stop_with_dependents(dependent, resolver, visited);
        }
        Self::stop_plugin(plugin);
    }

    pub fn dispose(&mut self) {
        self.levels.clear();
        self.by_id.clear();
    }
}

/// Highest start level first, then shorter ids, then by id.
fn stop_order(a: &Arc<Plugin>, b: &Arc<Plugin>) -> Ordering {
    b.configuration()
        .start_level()
        .cmp(&a.configuration().start_level())
        .then_with(|| a.id().len().cmp(&b.id().len()))
        .then_with(|| a.id().cmp(b.id()))
}
