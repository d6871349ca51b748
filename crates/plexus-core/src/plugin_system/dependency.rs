use std::fmt;

use crate::plugin_system::state::ResolveState;
use crate::plugin_system::version::Version;

/// Why a [`DependencyConstraint`] could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintFailure {
    /// No plugin with the target id is known to the resolver.
    Missing,
    /// The target exists but could not be resolved itself.
    TargetFailed,
    /// The target exists at a version lower than required.
    VersionTooLow { found: Version },
}

/// One edge of the resolution graph: "`owner` requires `target_id` at `min_version` or newer".
#[derive(Debug, Clone)]
pub struct DependencyConstraint {
    owner_id: String,
    target_id: String,
    min_version: Version,
    state: ResolveState,
    failure: Option<ConstraintFailure>,
}

impl DependencyConstraint {
    pub fn new(owner_id: impl Into<String>, target_id: impl Into<String>, min_version: Version) -> Self {
        Self {
            owner_id: owner_id.into(),
            target_id: target_id.into(),
            min_version,
            state: ResolveState::Resolvable,
            failure: None,
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn min_version(&self) -> Version {
        self.min_version
    }

    pub fn state(&self) -> ResolveState {
        self.state
    }

    pub fn failure(&self) -> Option<&ConstraintFailure> {
        self.failure.as_ref()
    }

    /// Human readable failure cause, present only after a failed resolution.
    pub fn cause(&self) -> Option<String> {
        self.failure.as_ref().map(|failure| self.describe(failure))
    }

    pub(crate) fn mark_resolvable(&mut self) {
        self.state = ResolveState::Resolvable;
        self.failure = None;
    }

    pub(crate) fn mark_success(&mut self) {
        self.state = ResolveState::ResolveSuccess;
        self.failure = None;
    }

    pub(crate) fn mark_failed(&mut self, failure: ConstraintFailure) {
        self.state = ResolveState::ResolveFailed;
        self.failure = Some(failure);
    }

    fn describe(&self, failure: &ConstraintFailure) -> String {
        let edge = format!(
            "the dependency [{}, {}] of plugin {} cannot be resolved",
            self.target_id, self.min_version, self.owner_id
        );
        match failure {
            ConstraintFailure::Missing => format!("{edge}: plugin {} does not exist", self.target_id),
            ConstraintFailure::TargetFailed => format!("{edge}: plugin {} failed to resolve", self.target_id),
            ConstraintFailure::VersionTooLow { found } => format!(
                "{edge}: plugin {} exists at version {found} which does not satisfy >= {}",
                self.target_id, self.min_version
            ),
        }
    }
}

impl fmt::Display for DependencyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} >= {}", self.target_id, self.min_version)
    }
}
