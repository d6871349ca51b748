use crate::plugin_system::configuration::PluginConfiguration;
use crate::plugin_system::dependency::{ConstraintFailure, DependencyConstraint};
use crate::plugin_system::state::ResolveState;
use crate::plugin_system::version::Version;

/// Resolution node for one plugin, owned by the resolver.
#[derive(Debug, Clone)]
pub struct PluginMetadata {
    id: String,
    version: Version,
    constraints: Vec<DependencyConstraint>,
    state: ResolveState,
    dependencies: Vec<String>,
}

impl PluginMetadata {
    /// Builds the node; a plugin without constraints is resolved right away.
    pub fn new(configuration: &PluginConfiguration) -> Self {
        let constraints: Vec<DependencyConstraint> = configuration
            .dependencies()
            .iter()
            .map(|dep| DependencyConstraint::new(configuration.id(), dep.id.clone(), dep.version))
            .collect();

        let mut metadata = Self {
            id: configuration.id().to_string(),
            version: configuration.version(),
            constraints,
            state: ResolveState::Resolvable,
            dependencies: Vec::new(),
        };
        metadata.mark_resolvable();
        metadata
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    pub fn constraints(&self) -> &[DependencyConstraint] {
        &self.constraints
    }

    /// First-level dependency ids; empty unless resolution succeeded.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn failed_constraints(&self) -> impl Iterator<Item = &DependencyConstraint> {
        self.constraints
            .iter()
            .filter(|constraint| constraint.state() == ResolveState::ResolveFailed)
    }

    /// Resets the node for another resolve pass.
    pub(crate) fn mark_resolvable(&mut self) {
        self.dependencies.clear();
        for constraint in &mut self.constraints {
            constraint.mark_resolvable();
        }
        if self.constraints.is_empty() {
            self.state = ResolveState::ResolveSuccess;
        } else {
            self.state = ResolveState::Resolvable;
        }
    }

    pub(crate) fn mark_success(&mut self) {
        self.state = ResolveState::ResolveSuccess;
        let mut dependencies: Vec<String> = Vec::with_capacity(self.constraints.len());
        for constraint in &mut self.constraints {
            constraint.mark_success();
            let target = constraint.target_id();
            if target != self.id && !dependencies.iter().any(|known| known == target) {
                dependencies.push(target.to_string());
            }
        }
        self.dependencies = dependencies;
    }

    /// Marks the node failed and records the cause on each offending constraint.
    ///
    /// A node without constraints can never fail, so the call is ignored for it.
    pub(crate) fn mark_failed(&mut self, failures: Vec<(usize, ConstraintFailure)>) {
        if self.constraints.is_empty() {
            log::warn!("Ignoring resolution failure for plugin {} which has no dependencies", self.id);
            return;
        }
        self.state = ResolveState::ResolveFailed;
        self.dependencies.clear();
        for (index, failure) in failures {
            if let Some(constraint) = self.constraints.get_mut(index) {
                constraint.mark_failed(failure);
            }
        }
    }
}
