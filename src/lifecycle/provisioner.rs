//! Provisioner
//!
//! Idempotent create-or-reuse of a single resource, followed by a wait for
//! kinds whose creation completes asynchronously.

use super::error::{LifecycleError, Result};
use super::locator::find_one;
use super::plane::ControlPlane;
use super::poller::{wait_until, PollConfig, PollOutcome};
use super::spec::ProvisionSpec;
use crate::aws::error::CloudError;
use crate::resource::{ConflictPolicy, ResourceDescriptor, ResourceState, ResourceSummary, TerminalStates};
use std::fmt;

/// What `ensure` did to reach the desired state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureAction {
    /// Already there; nothing was created
    Existing,
    Created,
    /// Deleted and created again (immutable kinds)
    Replaced,
    /// Existing resource reconfigured in place
    Updated,
    /// Activation step run on an existing resource
    Prepared,
}

impl fmt::Display for EnsureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnsureAction::Existing => "already exists",
            EnsureAction::Created => "created",
            EnsureAction::Replaced => "replaced",
            EnsureAction::Updated => "updated",
            EnsureAction::Prepared => "prepared",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub descriptor: ResourceDescriptor,
    pub action: EnsureAction,
    /// Provider-assigned id (domain id, agent id) when known
    pub id: Option<String>,
    /// Result of waiting for readiness, if a wait happened
    pub wait: Option<PollOutcome>,
}

impl EnsureOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(self.wait, Some(PollOutcome::TimedOut { .. }))
    }
}

pub struct Provisioner<'a> {
    plane: &'a dyn ControlPlane,
    poll: PollConfig,
}

impl<'a> Provisioner<'a> {
    pub fn new(plane: &'a dyn ControlPlane, poll: PollConfig) -> Self {
        Self { plane, poll }
    }

    /// Make sure the resource keyed by `descriptor` exists as described by `spec`.
    ///
    /// Inputs are validated before any cloud call. An existing resource is
    /// reused, replaced or updated according to its kind's conflict policy.
    pub async fn ensure(&self, descriptor: &ResourceDescriptor, spec: &ProvisionSpec) -> Result<EnsureOutcome> {
        spec.validate()?;
        if spec.kind() != descriptor.kind || spec.name() != descriptor.name {
            return Err(LifecycleError::Precondition(format!(
                "{} does not describe {}",
                spec.descriptor(&descriptor.region),
                descriptor
            )));
        }

        let existing = find_one(self.plane, descriptor).await?;

        let Some(existing) = existing else {
            tracing::info!("Creating {}", descriptor);
            let id = self.plane.create(spec, &descriptor.region).await?;
            return self.finish(descriptor, EnsureAction::Created, id).await;
        };

        if matches!(existing.state, ResourceState::Deleting | ResourceState::Deleted) {
            tracing::info!("{} is {}, recreating it once gone", descriptor, existing.status);
            self.wait_gone(descriptor).await?;
            let id = self.plane.create(spec, &descriptor.region).await?;
            return self.finish(descriptor, EnsureAction::Created, id).await;
        }

        let kind = descriptor.kind;
        let ready = kind.ready_states();

        match kind.conflict_policy() {
            ConflictPolicy::Reuse => {
                tracing::info!("{} already exists ({})", descriptor, existing.status);
                let id = existing.id.clone();
                if kind.is_async() && !ready.is_success(existing.state) {
                    return self.finish(descriptor, EnsureAction::Existing, id).await;
                }
                Ok(EnsureOutcome {
                    descriptor: descriptor.clone(),
                    action: EnsureAction::Existing,
                    id,
                    wait: None,
                })
            }
            ConflictPolicy::Replace => {
                let id = self.replace(descriptor, spec, &existing).await?;
                self.finish(descriptor, EnsureAction::Replaced, id).await
            }
            ConflictPolicy::UpdateInPlace => {
                if ready.is_failure(existing.state) {
                    tracing::warn!("{} is {}, recreating it", descriptor, existing.status);
                    let id = self.replace(descriptor, spec, &existing).await?;
                    return self.finish(descriptor, EnsureAction::Replaced, id).await;
                }

                if matches!(existing.state, ResourceState::Creating | ResourceState::Updating) {
                    tracing::info!("{} is {}, waiting before updating", descriptor, existing.status);
                    self.wait_ready(descriptor).await?;
                }

                tracing::info!("Updating {} in place", descriptor);
                self.plane.update(spec, &existing).await?;
                self.finish(descriptor, EnsureAction::Updated, existing.id.clone()).await
            }
        }
    }

    /// Run the activation step of an existing resource and wait until it is ready
    pub async fn prepare(&self, descriptor: &ResourceDescriptor) -> Result<EnsureOutcome> {
        let Some(existing) = find_one(self.plane, descriptor).await? else {
            return Err(CloudError::NotFound(descriptor.to_string()).into());
        };

        tracing::info!("Preparing {}", descriptor);
        self.plane.prepare(&existing).await?;

        let wait = wait_until(self.plane, descriptor, &TerminalStates::prepared(), self.poll).await?;
        check_wait(descriptor, &wait)?;

        Ok(EnsureOutcome {
            descriptor: descriptor.clone(),
            action: EnsureAction::Prepared,
            id: existing.id,
            wait: Some(wait),
        })
    }

    async fn replace(
        &self,
        descriptor: &ResourceDescriptor,
        spec: &ProvisionSpec,
        existing: &ResourceSummary,
    ) -> Result<Option<String>> {
        tracing::info!("Replacing {}", descriptor);
        match self.plane.delete(existing).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => tracing::debug!("{} already deleted", descriptor),
            Err(e) => return Err(e.into()),
        }

        self.wait_gone(descriptor).await?;
        Ok(self.plane.create(spec, &descriptor.region).await?)
    }

    async fn wait_gone(&self, descriptor: &ResourceDescriptor) -> Result<()> {
        let gone = wait_until(self.plane, descriptor, &TerminalStates::gone(), self.poll).await?;
        if !gone.is_reached() {
            check_wait(descriptor, &gone)?;
            return Err(LifecycleError::Precondition(format!(
                "{} was not deleted in time; retry once it is gone",
                descriptor
            )));
        }
        Ok(())
    }

    async fn wait_ready(&self, descriptor: &ResourceDescriptor) -> Result<PollOutcome> {
        let wait = wait_until(self.plane, descriptor, &descriptor.kind.ready_states(), self.poll).await?;
        check_wait(descriptor, &wait)?;
        Ok(wait)
    }

    async fn finish(
        &self,
        descriptor: &ResourceDescriptor,
        action: EnsureAction,
        id: Option<String>,
    ) -> Result<EnsureOutcome> {
        let wait = if descriptor.kind.is_async() {
            Some(self.wait_ready(descriptor).await?)
        } else {
            None
        };

        Ok(EnsureOutcome {
            descriptor: descriptor.clone(),
            action,
            id,
            wait,
        })
    }
}

fn check_wait(descriptor: &ResourceDescriptor, wait: &PollOutcome) -> Result<()> {
    match wait {
        PollOutcome::Failed { status, .. } => Err(LifecycleError::TerminalFailure {
            descriptor: descriptor.clone(),
            status: status.clone(),
        }),
        PollOutcome::TimedOut { last, attempts } => {
            tracing::warn!("{} still {} after {} attempt(s)", descriptor, last, attempts);
            Ok(())
        }
        PollOutcome::Reached { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::spec::{DomainSpec, EndpointSpec, ModelSpec};
    use crate::resource::ResourceKind;
    use crate::testing::{Call, MockControlPlane, TEST_REGION};
    use std::time::Duration;
    use ResourceState::*;

    const ROLE: &str = "arn:aws:iam::123456789012:role/DatabyExecution";

    fn provisioner(plane: &MockControlPlane) -> Provisioner<'_> {
        Provisioner::new(plane, PollConfig::new(5, Duration::ZERO))
    }

    fn domain_spec(role: &str) -> ProvisionSpec {
        ProvisionSpec::Domain(DomainSpec {
            name: "databy-ai-domain".into(),
            vpc_id: None,
            subnet_ids: vec![],
            execution_role_arn: role.into(),
        })
    }

    fn model_spec() -> ProvisionSpec {
        ProvisionSpec::Model(ModelSpec {
            name: "databy-hf-model".into(),
            execution_role_arn: ROLE.into(),
            hf_model_id: "distilbert-base-uncased".into(),
            hf_task: "fill-mask".into(),
            instance_type: "ml.t3.medium".into(),
        })
    }

    #[tokio::test]
    async fn test_existing_domain_is_reused_without_create() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Domain, "databy-ai-domain", Ready);

        let outcome = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Existing);
        assert!(plane.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_absent_domain_is_created_and_awaited() {
        let plane = MockControlPlane::new();
        plane.on_create(ResourceKind::Domain, &[Creating, Creating, Ready]);
        let d = ResourceDescriptor::new(ResourceKind::Domain, "databy-ai-domain", TEST_REGION);

        let outcome = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Created);
        assert!(matches!(outcome.wait, Some(PollOutcome::Reached { state: Ready, .. })));
        assert_eq!(outcome.id.as_deref(), Some("id-1"));
    }

    #[tokio::test]
    async fn test_second_ensure_creates_nothing() {
        let plane = MockControlPlane::new();
        let d = ResourceDescriptor::new(ResourceKind::Domain, "databy-ai-domain", TEST_REGION);
        let p = provisioner(&plane);

        p.ensure(&d, &domain_spec(ROLE)).await.unwrap();
        let second = p.ensure(&d, &domain_spec(ROLE)).await.unwrap();

        assert_eq!(second.action, EnsureAction::Existing);
        let creates = plane.calls().iter().filter(|c| matches!(c, Call::Create(_))).count();
        assert_eq!(creates, 1);
    }

    #[tokio::test]
    async fn test_missing_role_fails_before_any_call() {
        let plane = MockControlPlane::new();
        let d = ResourceDescriptor::new(ResourceKind::Domain, "databy-ai-domain", TEST_REGION);

        let err = provisioner(&plane).ensure(&d, &domain_spec("")).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Precondition(_)));
        assert!(plane.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_creation_is_terminal_failure() {
        let plane = MockControlPlane::new();
        plane.on_create(ResourceKind::Domain, &[Creating, Failed]);
        let d = ResourceDescriptor::new(ResourceKind::Domain, "databy-ai-domain", TEST_REGION);

        let err = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::TerminalFailure { .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_not_raised() {
        let plane = MockControlPlane::new();
        plane.on_create(ResourceKind::Domain, &[Creating]);
        let d = ResourceDescriptor::new(ResourceKind::Domain, "databy-ai-domain", TEST_REGION);

        let outcome = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap();
        assert!(outcome.timed_out());
    }

    #[tokio::test]
    async fn test_domain_being_deleted_is_recreated() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Domain, "databy-ai-domain", Deleting);
        plane.script(&d, &[Deleting, Absent]);

        let outcome = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Created);
        assert!(matches!(outcome.wait, Some(PollOutcome::Reached { state: Ready, .. })));
        assert_eq!(plane.mutating_calls(), vec![Call::Create(d.clone())]);
    }

    #[tokio::test]
    async fn test_domain_stuck_deleting_is_not_reused() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Domain, "databy-ai-domain", Deleting);

        let err = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Precondition(_)));
        assert!(plane.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_existing_model_is_replaced() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Model, "databy-hf-model", Ready);

        let outcome = provisioner(&plane).ensure(&d, &model_spec()).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Replaced);
        assert_eq!(
            plane.mutating_calls(),
            vec![Call::Delete(d.clone()), Call::Create(d.clone())]
        );
        assert_eq!(plane.state_of(ResourceKind::Model, "databy-hf-model"), Some(Ready));
    }

    #[tokio::test]
    async fn test_replace_tolerates_model_deleted_concurrently() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Model, "databy-hf-model", Ready);
        plane.fail_action_not_found(ResourceKind::Model, "databy-hf-model");

        let outcome = provisioner(&plane).ensure(&d, &model_spec()).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Replaced);
        assert_eq!(
            plane.mutating_calls(),
            vec![Call::Delete(d.clone()), Call::Create(d.clone())]
        );
        assert_eq!(plane.state_of(ResourceKind::Model, "databy-hf-model"), Some(Ready));
    }

    #[tokio::test]
    async fn test_existing_endpoint_is_updated_in_place() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Endpoint, "databy-endpoint", Ready);
        let spec = ProvisionSpec::Endpoint(EndpointSpec {
            name: "databy-endpoint".into(),
            config_name: "databy-endpoint-config".into(),
        });

        let outcome = provisioner(&plane).ensure(&d, &spec).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Updated);
        assert_eq!(plane.mutating_calls(), vec![Call::Update(d)]);
        assert!(matches!(outcome.wait, Some(PollOutcome::Reached { state: Ready, .. })));
    }

    #[tokio::test]
    async fn test_mismatched_descriptor_is_precondition() {
        let plane = MockControlPlane::new();
        let d = ResourceDescriptor::new(ResourceKind::Domain, "other-domain", TEST_REGION);
        let err = provisioner(&plane).ensure(&d, &domain_spec(ROLE)).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Precondition(_)));
    }

    #[tokio::test]
    async fn test_prepare_agent_waits_for_ready() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Agent, "databy-code-agent", Idle);

        let outcome = provisioner(&plane).prepare(&d).await.unwrap();
        assert_eq!(outcome.action, EnsureAction::Prepared);
        assert_eq!(plane.state_of(ResourceKind::Agent, "databy-code-agent"), Some(Ready));
    }

    #[tokio::test]
    async fn test_prepare_missing_agent_is_not_found() {
        let plane = MockControlPlane::new();
        let d = ResourceDescriptor::new(ResourceKind::Agent, "databy-code-agent", TEST_REGION);
        let err = provisioner(&plane).prepare(&d).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Cloud(CloudError::NotFound(_))));
    }
}
