//! Resource kinds and descriptors
//!
//! A [`ResourceDescriptor`] is the logical key of a provider-owned entity.
//! Everything we know about its current condition is a transient
//! [`ResourceSummary`] fetched during one invocation.

use super::state::{ResourceState, TerminalStates};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// Kinds of provider resources the lifecycle manager knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum ResourceKind {
    /// Studio domain (workspace grouping)
    Domain,
    /// Deployed, continuously billable inference endpoint
    Endpoint,
    /// Immutable endpoint configuration
    EndpointConfig,
    /// Immutable hosted model definition
    Model,
    /// Identity inside a domain
    UserProfile,
    /// Bedrock agent
    Agent,
    TrainingJob,
    TransformJob,
    ProcessingJob,
    NotebookInstance,
    /// Bedrock provisioned model throughput
    ProvisionedThroughput,
    /// Tagged EC2 instance
    ComputeInstance,
    /// Lambda provisioned-concurrency configuration
    FunctionConcurrency,
    /// AgentCore code interpreter session
    CodeInterpreterSession,
}

/// What `ensure` does when a resource with the same key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Return the existing resource untouched
    Reuse,
    /// Delete the existing resource and create it again
    Replace,
    /// Push the new spec onto the existing resource
    UpdateInPlace,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 14] = [
        ResourceKind::Domain,
        ResourceKind::Endpoint,
        ResourceKind::EndpointConfig,
        ResourceKind::Model,
        ResourceKind::UserProfile,
        ResourceKind::Agent,
        ResourceKind::TrainingJob,
        ResourceKind::TransformJob,
        ResourceKind::ProcessingJob,
        ResourceKind::NotebookInstance,
        ResourceKind::ProvisionedThroughput,
        ResourceKind::ComputeInstance,
        ResourceKind::FunctionConcurrency,
        ResourceKind::CodeInterpreterSession,
    ];

    /// Registry key (matches the keys in `src/resources/*.json`)
    pub fn key(self) -> &'static str {
        match self {
            ResourceKind::Domain => "domain",
            ResourceKind::Endpoint => "endpoint",
            ResourceKind::EndpointConfig => "endpoint-config",
            ResourceKind::Model => "model",
            ResourceKind::UserProfile => "user-profile",
            ResourceKind::Agent => "agent",
            ResourceKind::TrainingJob => "training-job",
            ResourceKind::TransformJob => "transform-job",
            ResourceKind::ProcessingJob => "processing-job",
            ResourceKind::NotebookInstance => "notebook-instance",
            ResourceKind::ProvisionedThroughput => "provisioned-throughput",
            ResourceKind::ComputeInstance => "compute-instance",
            ResourceKind::FunctionConcurrency => "function-concurrency",
            ResourceKind::CodeInterpreterSession => "code-interpreter-session",
        }
    }

    /// Sweep priority (lower number = handled first)
    ///
    /// Endpoints bill per instance-hour around the clock, so they go first.
    /// Kinds that are never swept return `None`.
    pub fn sweep_priority(self) -> Option<u8> {
        match self {
            ResourceKind::Endpoint => Some(0),
            ResourceKind::TrainingJob => Some(1),
            ResourceKind::TransformJob => Some(2),
            ResourceKind::ProcessingJob => Some(3),
            ResourceKind::NotebookInstance => Some(4),
            ResourceKind::ProvisionedThroughput => Some(5),
            ResourceKind::ComputeInstance => Some(6),
            ResourceKind::FunctionConcurrency => Some(7),
            ResourceKind::CodeInterpreterSession => Some(8),
            _ => None,
        }
    }

    /// Kinds whose creation returns before the resource is usable
    pub fn is_async(self) -> bool {
        matches!(
            self,
            ResourceKind::Domain
                | ResourceKind::Endpoint
                | ResourceKind::UserProfile
                | ResourceKind::Agent
        )
    }

    /// Mutability of an existing resource.
    ///
    /// Models and endpoint configs cannot be modified after creation;
    /// endpoints accept a live config swap.
    pub fn conflict_policy(self) -> ConflictPolicy {
        match self {
            ResourceKind::Model | ResourceKind::EndpointConfig => ConflictPolicy::Replace,
            ResourceKind::Endpoint => ConflictPolicy::UpdateInPlace,
            _ => ConflictPolicy::Reuse,
        }
    }

    /// States that end a wait for this kind to become usable
    pub fn ready_states(self) -> TerminalStates {
        use ResourceState::*;
        match self {
            ResourceKind::Agent => TerminalStates::new(&[Idle, Ready], &[Failed]),
            ResourceKind::TrainingJob | ResourceKind::TransformJob | ResourceKind::ProcessingJob => {
                TerminalStates::new(&[Stopped], &[Failed])
            }
            ResourceKind::ComputeInstance => TerminalStates::new(&[Running], &[Deleted]),
            ResourceKind::Model | ResourceKind::EndpointConfig => {
                TerminalStates::new(&[Ready], &[])
            }
            _ => TerminalStates::new(&[Ready], &[Failed]),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|k| k.key() == s)
            .ok_or_else(|| format!("unknown resource kind: {}", s))
    }
}

/// Logical key of a provider resource: (kind, name, region)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    pub kind: ResourceKind,
    pub name: String,
    pub region: String,
    /// Enclosing resource, for kinds that only exist inside another one
    /// (domain id of a user profile, function name of a concurrency config)
    pub parent: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(kind: ResourceKind, name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            region: region.into(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Placeholder descriptor for errors that concern a whole kind
    pub fn whole_kind(kind: ResourceKind, region: impl Into<String>) -> Self {
        Self::new(kind, "*", region)
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}/{}/{} ({})", self.kind, parent, self.name, self.region),
            None => write!(f, "{}/{} ({})", self.kind, self.name, self.region),
        }
    }
}

/// Point-in-time view of a resource as reported by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSummary {
    pub descriptor: ResourceDescriptor,
    /// Provider-assigned identifier when it differs from the name
    pub id: Option<String>,
    /// Raw provider status string
    pub status: String,
    pub state: ResourceState,
    pub created_at: Option<DateTime<Utc>>,
}

impl ResourceSummary {
    pub fn new(descriptor: ResourceDescriptor, status: impl Into<String>, state: ResourceState) -> Self {
        Self {
            descriptor,
            id: None,
            status: status.into(),
            state,
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Identifier to pass to provider operations keyed by id
    pub fn provider_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.descriptor.name)
    }
}
