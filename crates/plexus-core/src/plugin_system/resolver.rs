//! # Plexus Core Plugin Resolver
//!
//! Decides, for every known plugin, whether its dependency constraints are
//! transitively satisfiable.
//!
//! Resolution is a fixpoint mark-and-sweep over the metadata graph:
//!
//! - nodes without constraints are resolved immediately,
//! - each pass marks a node failed when any constraint targets a missing
//!   plugin, a failed plugin, or a plugin whose version is too low,
//! - passes repeat until no new failure appears,
//! - whatever is still resolvable afterwards is resolved.
//!
//! Failure only ever spreads from nodes that already failed, so cycles whose
//! external constraints hold converge to success without any recursion.
use std::collections::{BTreeMap, HashSet, VecDeque};

use log::{debug, info};

use crate::plugin_system::configuration::PluginConfiguration;
use crate::plugin_system::dependency::ConstraintFailure;
use crate::plugin_system::metadata::PluginMetadata;
use crate::plugin_system::state::ResolveState;

/// Owns the resolution graph, keyed by plugin id.
///
/// Iteration follows id order, which keeps recorded failure causes
/// identical from one run to the next.
#[derive(Debug, Default)]
pub struct PluginResolver {
    metadata: BTreeMap<String, PluginMetadata>,
}

impl PluginResolver {
    /// Builds one metadata node per configuration. Call [`resolve`](Self::resolve) afterwards.
    pub fn new<'a>(configurations: impl IntoIterator<Item = &'a PluginConfiguration>) -> Self {
        let mut metadata = BTreeMap::new();
        for configuration in configurations {
            metadata
                .entry(configuration.id().to_string())
                .or_insert_with(|| PluginMetadata::new(configuration));
        }
        Self { metadata }
    }

    /// Runs passes until no new failure shows up, then resolves every remaining node.
    pub fn resolve(&mut self) {
        let mut passes = 0usize;
        loop {
            passes += 1;
            if !self.resolve_pass() {
                break;
            }
        }

        let resolvable: Vec<String> = self
            .metadata
            .values()
            .filter(|node| node.state() == ResolveState::Resolvable)
            .map(|node| node.id().to_string())
            .collect();
        for id in resolvable {
            if let Some(node) = self.metadata.get_mut(&id) {
                node.mark_success();
            }
        }

        debug!(
            "Resolved {} plugins in {} passes ({} failed)",
            self.metadata.len(),
            passes,
            self.metadata
                .values()
                .filter(|node| node.state() == ResolveState::ResolveFailed)
                .count()
        );
    }

    /// One sweep over every resolvable node. Returns whether any node failed.
    fn resolve_pass(&mut self) -> bool {
        let mut failed_any = false;
        let ids: Vec<String> = self.metadata.keys().cloned().collect();
        for id in ids {
            let failures = match self.metadata.get(&id) {
                Some(node) if node.state() == ResolveState::Resolvable => self.unsatisfied_constraints(node),
                _ => continue,
            };
            if failures.is_empty() {
                continue;
            }
            if let Some(node) = self.metadata.get_mut(&id) {
                node.mark_failed(failures);
                failed_any = true;
            }
        }
        failed_any
    }

    fn unsatisfied_constraints(&self, node: &PluginMetadata) -> Vec<(usize, ConstraintFailure)> {
        node.constraints()
            .iter()
            .enumerate()
            .filter_map(|(index, constraint)| {
                let failure = match self.metadata.get(constraint.target_id()) {
                    None => ConstraintFailure::Missing,
                    Some(target) if target.state() == ResolveState::ResolveFailed => ConstraintFailure::TargetFailed,
                    Some(target) if !target.version().satisfies(&constraint.min_version()) => {
                        ConstraintFailure::VersionTooLow { found: target.version() }
                    }
                    Some(_) => return None,
                };
                Some((index, failure))
            })
            .collect()
    }

    /// Adds a plugin and re-resolves. Known ids are ignored.
    ///
    /// Every failed node is reset first since the newcomer may satisfy a
    /// constraint that was broken before.
    pub fn add(&mut self, configuration: &PluginConfiguration) {
        if self.metadata.contains_key(configuration.id()) {
            return;
        }
        info!("Adding plugin {} to the resolver", configuration.id());
        self.metadata
            .insert(configuration.id().to_string(), PluginMetadata::new(configuration));
        for node in self.metadata.values_mut() {
            if node.state() == ResolveState::ResolveFailed {
                node.mark_resolvable();
            }
        }
        self.resolve();
    }

    /// Removes a plugin. Unknown ids are ignored.
    ///
    /// Dropping a failed node cannot repair anybody, so nothing is
    /// re-evaluated in that case. Dropping a resolved node may break its
    /// dependents, so every resolved node is re-evaluated.
    pub fn remove(&mut self, id: &str) {
        let Some(removed) = self.metadata.remove(id) else {
            return;
        };
        info!("Removing plugin {} from the resolver", id);
        if removed.state() == ResolveState::ResolveFailed {
            return;
        }
        for node in self.metadata.values_mut() {
            if node.state() == ResolveState::ResolveSuccess {
                node.mark_resolvable();
            }
        }
        self.resolve();
    }

    pub fn is_resolve_success(&self, id: &str) -> bool {
        self.metadata
            .get(id)
            .is_some_and(|node| node.state() == ResolveState::ResolveSuccess)
    }

    pub fn metadata(&self, id: &str) -> Option<&PluginMetadata> {
        self.metadata.get(id)
    }

    /// First-level dependencies of a plugin, `None` if the id is unknown.
    pub fn dependencies(&self, id: &str) -> Option<&[String]> {
        self.metadata.get(id).map(PluginMetadata::dependencies)
    }

    /// Breadth-first expansion of constraint targets, for diagnostics.
    ///
    /// Self references and ids already visited are skipped. Targets unknown to
    /// the resolver appear in the chain but are not expanded.
    pub fn dependency_chain(&self, id: &str) -> Option<Vec<String>> {
        let root = self.metadata.get(id)?;
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(root.id());

        let mut queue: VecDeque<&PluginMetadata> = VecDeque::new();
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            for constraint in node.constraints() {
                let target = constraint.target_id();
                if !seen.insert(target) {
                    continue;
                }
                chain.push(target.to_string());
                if let Some(next) = self.metadata.get(target) {
                    queue.push_back(next);
                }
            }
        }
        Some(chain)
    }

    /// Every failure cause recorded for a plugin.
    pub fn failure_causes(&self, id: &str) -> Vec<String> {
        self.metadata
            .get(id)
            .map(|node| node.failed_constraints().filter_map(|c| c.cause()).collect())
            .unwrap_or_default()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.metadata.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    pub fn dispose(&mut self) {
        self.metadata.clear();
    }
}
