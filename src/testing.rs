//! Scripted in-memory control plane for tests (`testing` feature).
//!
//! [`MockControlPlane`] keeps resources in insertion order (standing in for
//! provider order), records every call it receives, advances per-resource
//! state scripts on each describe, and fails on demand. A script that
//! reaches `Absent` removes the resource.

use crate::aws::error::{CloudError, Result};
use crate::lifecycle::{ControlPlane, ProvisionSpec};
use crate::resource::{ResourceDescriptor, ResourceFilter, ResourceKind, ResourceState, ResourceSummary};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

pub const TEST_REGION: &str = "us-east-1";

/// One call received by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(ResourceKind),
    Describe(ResourceDescriptor),
    Create(ResourceDescriptor),
    Update(ResourceDescriptor),
    Delete(ResourceDescriptor),
    Stop(ResourceDescriptor),
    Prepare(ResourceDescriptor),
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Call::List(_) | Call::Describe(_))
    }
}

/// How an injected action failure surfaces
#[derive(Debug, Clone)]
enum Failure {
    Command(String),
    /// The resource vanished before the call reached it
    NotFound,
}

struct Entry {
    summary: ResourceSummary,
    script: VecDeque<ResourceState>,
}

#[derive(Default)]
struct Inner {
    resources: Vec<Entry>,
    calls: Vec<Call>,
    list_failures: HashMap<ResourceKind, String>,
    action_failures: HashMap<(ResourceKind, String), Failure>,
    describe_failure: Option<String>,
    create_scripts: HashMap<ResourceKind, Vec<ResourceState>>,
    next_id: u32,
}

#[derive(Default)]
pub struct MockControlPlane {
    inner: Mutex<Inner>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the calls it recorded
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add an existing resource in [`TEST_REGION`]
    pub fn add(&self, kind: ResourceKind, name: &str, state: ResourceState) -> ResourceDescriptor {
        let descriptor = ResourceDescriptor::new(kind, name, TEST_REGION);
        self.add_summary(ResourceSummary::new(descriptor.clone(), state.as_str(), state));
        descriptor
    }

    pub fn add_summary(&self, summary: ResourceSummary) {
        self.lock().resources.push(Entry {
            summary,
            script: VecDeque::new(),
        });
    }

    /// States the resource reports on successive describes; the last one sticks
    pub fn script(&self, descriptor: &ResourceDescriptor, states: &[ResourceState]) {
        let mut inner = self.lock();
        if let Some(entry) = find_entry(&mut inner.resources, descriptor) {
            entry.script = states.iter().copied().collect();
        }
    }

    /// Script applied to resources of `kind` created from now on
    pub fn on_create(&self, kind: ResourceKind, states: &[ResourceState]) {
        self.lock().create_scripts.insert(kind, states.to_vec());
    }

    pub fn fail_list(&self, kind: ResourceKind, message: &str) {
        self.lock().list_failures.insert(kind, message.to_string());
    }

    /// Make every mutating call against `name` fail
    pub fn fail_action(&self, kind: ResourceKind, name: &str, message: &str) {
        self.lock()
            .action_failures
            .insert((kind, name.to_string()), Failure::Command(message.to_string()));
    }

    /// Make the next mutating call against `name` find it already removed
    pub fn fail_action_not_found(&self, kind: ResourceKind, name: &str) {
        self.lock()
            .action_failures
            .insert((kind, name.to_string()), Failure::NotFound);
    }

    pub fn fail_describe(&self, message: &str) {
        self.lock().describe_failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    /// Current state of a resource, `None` once it is gone
    pub fn state_of(&self, kind: ResourceKind, name: &str) -> Option<ResourceState> {
        self.lock()
            .resources
            .iter()
            .find(|e| e.summary.descriptor.kind == kind && e.summary.descriptor.name == name)
            .map(|e| e.summary.state)
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    fn check_action(&self, operation: &str, descriptor: &ResourceDescriptor) -> Result<()> {
        let key = (descriptor.kind, descriptor.name.clone());
        let mut inner = self.lock();
        match inner.action_failures.get(&key).cloned() {
            Some(Failure::Command(message)) => Err(CloudError::CommandFailed {
                operation: operation.to_string(),
                message,
            }),
            Some(Failure::NotFound) => {
                // Gone for good: later calls see an absent resource
                inner.action_failures.remove(&key);
                inner.resources.retain(|e| !same_key(&e.summary.descriptor, descriptor));
                Err(CloudError::NotFound(descriptor.to_string()))
            }
            None => Ok(()),
        }
    }

    fn set_state(&self, descriptor: &ResourceDescriptor, state: ResourceState, script: &[ResourceState]) {
        let mut inner = self.lock();
        if let Some(entry) = find_entry(&mut inner.resources, descriptor) {
            entry.summary.state = state;
            entry.summary.status = state.as_str().to_string();
            entry.script = script.iter().copied().collect();
        }
    }
}

fn find_entry<'a>(resources: &'a mut [Entry], descriptor: &ResourceDescriptor) -> Option<&'a mut Entry> {
    resources.iter_mut().find(|e| same_key(&e.summary.descriptor, descriptor))
}

fn same_key(have: &ResourceDescriptor, want: &ResourceDescriptor) -> bool {
    have.kind == want.kind
        && have.name == want.name
        && have.region == want.region
        && (want.parent.is_none() || have.parent == want.parent)
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn list(
        &self,
        kind: ResourceKind,
        filter: &ResourceFilter,
        region: &str,
    ) -> Result<Vec<ResourceSummary>> {
        self.record(Call::List(kind));

        let inner = self.lock();
        if let Some(message) = inner.list_failures.get(&kind) {
            return Err(CloudError::CommandFailed {
                operation: format!("list {}", kind),
                message: message.clone(),
            });
        }

        Ok(inner
            .resources
            .iter()
            .map(|e| &e.summary)
            .filter(|s| s.descriptor.kind == kind && s.descriptor.region == region && filter.matches(s))
            .cloned()
            .collect())
    }

    async fn describe(&self, descriptor: &ResourceDescriptor) -> Result<Option<ResourceSummary>> {
        self.record(Call::Describe(descriptor.clone()));

        let mut inner = self.lock();
        if let Some(message) = &inner.describe_failure {
            return Err(CloudError::Throttled(message.clone()));
        }

        let Some(entry) = find_entry(&mut inner.resources, descriptor) else {
            return Ok(None);
        };
        if let Some(next) = entry.script.pop_front() {
            entry.summary.state = next;
            entry.summary.status = next.as_str().to_string();
        }
        let summary = entry.summary.clone();

        // A script reaching Absent means the provider has forgotten the resource
        if summary.state == ResourceState::Absent {
            inner.resources.retain(|e| !same_key(&e.summary.descriptor, descriptor));
            return Ok(None);
        }
        Ok(Some(summary))
    }

    async fn create(&self, spec: &ProvisionSpec, region: &str) -> Result<Option<String>> {
        let descriptor = spec.descriptor(region);
        self.record(Call::Create(descriptor.clone()));
        self.check_action("create", &descriptor)?;

        let mut inner = self.lock();
        inner.next_id += 1;
        let id = format!("id-{}", inner.next_id);

        let script: VecDeque<ResourceState> = inner
            .create_scripts
            .get(&descriptor.kind)
            .cloned()
            .unwrap_or_default()
            .into();
        let state = script
            .front()
            .copied()
            .or_else(|| descriptor.kind.ready_states().success.first().copied())
            .unwrap_or(ResourceState::Ready);

        let summary = ResourceSummary::new(descriptor, state.as_str(), state).with_id(id.clone());
        inner.resources.push(Entry { summary, script });
        Ok(Some(id))
    }

    async fn update(&self, _spec: &ProvisionSpec, existing: &ResourceSummary) -> Result<()> {
        self.record(Call::Update(existing.descriptor.clone()));
        self.check_action("update", &existing.descriptor)?;
        self.set_state(
            &existing.descriptor,
            ResourceState::Updating,
            &[ResourceState::Updating, ResourceState::Ready],
        );
        Ok(())
    }

    async fn delete(&self, target: &ResourceSummary) -> Result<()> {
        self.record(Call::Delete(target.descriptor.clone()));
        self.check_action("delete", &target.descriptor)?;
        self.lock()
            .resources
            .retain(|e| !same_key(&e.summary.descriptor, &target.descriptor));
        Ok(())
    }

    async fn stop(&self, target: &ResourceSummary) -> Result<()> {
        self.record(Call::Stop(target.descriptor.clone()));
        self.check_action("stop", &target.descriptor)?;
        self.set_state(
            &target.descriptor,
            ResourceState::Stopping,
            &[ResourceState::Stopping, ResourceState::Stopped],
        );
        Ok(())
    }

    async fn prepare(&self, target: &ResourceSummary) -> Result<()> {
        self.record(Call::Prepare(target.descriptor.clone()));
        self.check_action("prepare", &target.descriptor)?;
        self.set_state(
            &target.descriptor,
            ResourceState::Updating,
            &[ResourceState::Updating, ResourceState::Ready],
        );
        Ok(())
    }
}
