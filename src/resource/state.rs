//! Resource states and per-kind transition tables
//!
//! Provider status strings are mapped onto [`ResourceState`] by the registry
//! (`status_map` in `src/resources/*.json`). The tables here declare which
//! moves between those states each kind is expected to make.

use super::kind::ResourceKind;
use serde::Deserialize;
use std::fmt;

/// Normalized resource state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Absent,
    Creating,
    Updating,
    /// In service / prepared / ready for use
    Ready,
    /// Job or instance actively executing
    Running,
    /// Exists but needs an activation step before use
    Idle,
    Failed,
    Stopping,
    Stopped,
    Deleting,
    Deleted,
    /// Status string the registry has no mapping for
    Unknown,
}

impl ResourceState {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceState::Absent => "absent",
            ResourceState::Creating => "creating",
            ResourceState::Updating => "updating",
            ResourceState::Ready => "ready",
            ResourceState::Running => "running",
            ResourceState::Idle => "idle",
            ResourceState::Failed => "failed",
            ResourceState::Stopping => "stopping",
            ResourceState::Stopped => "stopped",
            ResourceState::Deleting => "deleting",
            ResourceState::Deleted => "deleted",
            ResourceState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success and failure subsets that end a wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalStates {
    pub success: Vec<ResourceState>,
    pub failure: Vec<ResourceState>,
}

impl TerminalStates {
    pub fn new(success: &[ResourceState], failure: &[ResourceState]) -> Self {
        Self {
            success: success.to_vec(),
            failure: failure.to_vec(),
        }
    }

    /// Wait for a resource to disappear
    pub fn gone() -> Self {
        Self::new(
            &[ResourceState::Absent, ResourceState::Deleted],
            &[ResourceState::Failed],
        )
    }

    /// Wait for an agent to finish preparing
    pub fn prepared() -> Self {
        Self::new(&[ResourceState::Ready], &[ResourceState::Failed])
    }

    pub fn is_success(&self, state: ResourceState) -> bool {
        self.success.contains(&state)
    }

    pub fn is_failure(&self, state: ResourceState) -> bool {
        self.failure.contains(&state)
    }
}

use ResourceState::*;

const STUDIO_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Ready),
    (Creating, Failed),
    (Ready, Updating),
    (Updating, Ready),
    (Updating, Failed),
    (Ready, Deleting),
    (Failed, Deleting),
    (Deleting, Absent),
    (Deleting, Failed),
];

const ENDPOINT_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Ready),
    (Creating, Failed),
    (Ready, Updating),
    (Updating, Ready),
    (Updating, Failed),
    (Ready, Stopped),
    (Stopped, Ready),
    (Ready, Deleting),
    (Updating, Deleting),
    (Stopped, Deleting),
    (Failed, Deleting),
    (Deleting, Absent),
];

const IMMUTABLE_EDGES: &[(ResourceState, ResourceState)] = &[(Absent, Ready), (Ready, Absent)];

const AGENT_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Idle),
    (Creating, Failed),
    (Idle, Updating),
    (Ready, Updating),
    (Updating, Ready),
    (Updating, Idle),
    (Updating, Failed),
    (Idle, Deleting),
    (Ready, Deleting),
    (Failed, Deleting),
    (Deleting, Absent),
];

const JOB_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Running),
    (Running, Stopping),
    (Running, Stopped),
    (Running, Failed),
    (Stopping, Stopped),
];

const NOTEBOOK_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Ready),
    (Creating, Failed),
    (Ready, Updating),
    (Updating, Ready),
    (Ready, Stopping),
    (Stopping, Stopped),
    (Stopped, Creating),
    (Stopped, Deleting),
    (Failed, Deleting),
    (Deleting, Absent),
];

const THROUGHPUT_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Ready),
    (Creating, Failed),
    (Ready, Updating),
    (Updating, Ready),
    (Updating, Failed),
    (Ready, Absent),
    (Failed, Absent),
];

const INSTANCE_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Running),
    (Running, Stopping),
    (Stopping, Stopped),
    (Stopped, Creating),
    (Running, Deleting),
    (Stopped, Deleting),
    (Deleting, Deleted),
];

const CONCURRENCY_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Creating),
    (Creating, Ready),
    (Creating, Failed),
    (Ready, Absent),
    (Failed, Absent),
];

const SESSION_EDGES: &[(ResourceState, ResourceState)] = &[
    (Absent, Ready),
    (Ready, Deleted),
    (Ready, Absent),
    (Deleted, Absent),
];

/// Declared transition table of one resource kind
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    pub kind: ResourceKind,
    edges: &'static [(ResourceState, ResourceState)],
}

impl Lifecycle {
    pub fn of(kind: ResourceKind) -> Self {
        let edges = match kind {
            ResourceKind::Domain | ResourceKind::UserProfile => STUDIO_EDGES,
            ResourceKind::Endpoint => ENDPOINT_EDGES,
            ResourceKind::Model | ResourceKind::EndpointConfig => IMMUTABLE_EDGES,
            ResourceKind::Agent => AGENT_EDGES,
            ResourceKind::TrainingJob | ResourceKind::TransformJob | ResourceKind::ProcessingJob => {
                JOB_EDGES
            }
            ResourceKind::NotebookInstance => NOTEBOOK_EDGES,
            ResourceKind::ProvisionedThroughput => THROUGHPUT_EDGES,
            ResourceKind::ComputeInstance => INSTANCE_EDGES,
            ResourceKind::FunctionConcurrency => CONCURRENCY_EDGES,
            ResourceKind::CodeInterpreterSession => SESSION_EDGES,
        };
        Self { kind, edges }
    }

    /// Whether observing `to` after `from` is an expected move.
    ///
    /// Staying put is always allowed; `Unknown` never matches.
    pub fn permits(&self, from: ResourceState, to: ResourceState) -> bool {
        from == to || self.edges.contains(&(from, to))
    }
}
