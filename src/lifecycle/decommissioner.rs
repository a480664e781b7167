//! Decommissioner
//!
//! Finds billable resources, asks once for confirmation, then deletes or
//! stops them in a fixed priority order. A failure on one resource is
//! recorded and the sweep carries on.

use super::confirm::Confirm;
use super::error::{LifecycleError, Result};
use super::locator::find;
use super::plane::ControlPlane;
use super::report::{OperationResult, Outcome};
use crate::aws::cli::format_aws_error;
use crate::resource::{
    get_resource, NamePattern, ResourceDescriptor, ResourceKind, ResourceState, ResourceSummary, SweepAction,
};
use clap::ValueEnum;
use std::fmt;

/// Which kinds an emergency stop covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SweepScope {
    /// Inference endpoints only
    Endpoints,
    /// Endpoints, training/transform/processing jobs and notebook instances
    Managed,
    /// Managed plus provisioned throughput, tagged instances, provisioned
    /// concurrency and code interpreter sessions
    Full,
}

impl SweepScope {
    /// Kinds in sweep order
    pub fn kinds(self) -> Vec<ResourceKind> {
        let mut kinds: Vec<ResourceKind> = ResourceKind::ALL
            .into_iter()
            .filter(|k| k.sweep_priority().is_some())
            .filter(|k| match self {
                SweepScope::Endpoints => *k == ResourceKind::Endpoint,
                SweepScope::Managed => matches!(
                    k,
                    ResourceKind::Endpoint
                        | ResourceKind::TrainingJob
                        | ResourceKind::TransformJob
                        | ResourceKind::ProcessingJob
                        | ResourceKind::NotebookInstance
                ),
                SweepScope::Full => true,
            })
            .collect();
        kinds.sort_by_key(|k| k.sweep_priority());
        kinds
    }
}

impl fmt::Display for SweepScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SweepScope::Endpoints => "endpoints",
            SweepScope::Managed => "managed",
            SweepScope::Full => "full",
        };
        f.write_str(s)
    }
}

/// Kinds removed by a prefix cleanup, in deletion order
pub const CLEANUP_KINDS: [ResourceKind; 3] =
    [ResourceKind::Endpoint, ResourceKind::EndpointConfig, ResourceKind::Model];

#[derive(Debug)]
pub enum SweepOutcome {
    Completed(OperationResult),
    /// Confirmation declined; nothing was modified
    Aborted,
}

/// Enumeration of one kind
#[derive(Debug, Clone)]
pub struct KindPlan {
    pub kind: ResourceKind,
    /// Targets with their action, or the reason the kind could not be listed
    pub targets: std::result::Result<Vec<(ResourceSummary, SweepAction)>, String>,
}

/// Everything a sweep would touch, gathered before any mutating call
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub region: String,
    pub kinds: Vec<KindPlan>,
}

impl SweepPlan {
    pub fn target_count(&self) -> usize {
        self.kinds
            .iter()
            .filter_map(|k| k.targets.as_ref().ok())
            .map(Vec::len)
            .sum()
    }

    pub fn targets(&self) -> impl Iterator<Item = &(ResourceSummary, SweepAction)> {
        self.kinds
            .iter()
            .filter_map(|k| k.targets.as_ref().ok())
            .flatten()
    }
}

pub struct Decommissioner<'a> {
    plane: &'a dyn ControlPlane,
    confirm: &'a dyn Confirm,
}

impl<'a> Decommissioner<'a> {
    pub fn new(plane: &'a dyn ControlPlane, confirm: &'a dyn Confirm) -> Self {
        Self { plane, confirm }
    }

    /// Enumerate billable resources of every kind in `scope`
    pub async fn plan_sweep(&self, region: &str, scope: SweepScope) -> SweepPlan {
        let mut kinds = Vec::new();

        for kind in scope.kinds() {
            let Some(def) = get_resource(kind) else {
                kinds.push(KindPlan {
                    kind,
                    targets: Err(format!("{} is not registered", kind)),
                });
                continue;
            };
            let Some(sweep) = def.sweep.as_ref() else {
                continue;
            };

            let targets: std::result::Result<Vec<_>, String> = find(self.plane, kind, &NamePattern::Any, region)
                .await
                .map(|found| {
                    found
                        .into_iter()
                        .filter(|s| def.is_billable(s.state))
                        .map(|s| (s, sweep.action))
                        .collect()
                })
                .map_err(|e| {
                    tracing::warn!("Failed to list {} in {}: {}", kind, region, e);
                    format_aws_error(&e)
                });

            kinds.push(KindPlan { kind, targets });
        }

        SweepPlan {
            region: region.to_string(),
            kinds,
        }
    }

    /// Enumerate endpoints, endpoint configs and models named `prefix*`
    pub async fn plan_cleanup(&self, region: &str, prefix: &str) -> Result<SweepPlan> {
        if prefix.trim().is_empty() {
            return Err(LifecycleError::Precondition(
                "cleanup prefix must not be empty".to_string(),
            ));
        }

        let pattern = NamePattern::Prefix(prefix.to_string());
        let mut kinds = Vec::new();

        for kind in CLEANUP_KINDS {
            let targets: std::result::Result<Vec<_>, String> = find(self.plane, kind, &pattern, region)
                .await
                .map(|found| {
                    found
                        .into_iter()
                        .filter(|s| !matches!(s.state, ResourceState::Deleting | ResourceState::Deleted))
                        .map(|s| (s, SweepAction::Delete))
                        .collect()
                })
                .map_err(|e| {
                    tracing::warn!("Failed to list {} in {}: {}", kind, region, e);
                    format_aws_error(&e)
                });

            kinds.push(KindPlan { kind, targets });
        }

        Ok(SweepPlan {
            region: region.to_string(),
            kinds,
        })
    }

    /// Act on a plan. Asks for confirmation once when there is anything to
    /// modify and `dry_run` is off.
    pub async fn execute(&self, plan: SweepPlan, dry_run: bool) -> SweepOutcome {
        let count = plan.target_count();

        if !dry_run && count > 0 {
            let prompt = format!("Delete or stop {} resource(s) in {}?", count, plan.region);
            if !self.confirm.confirm(&prompt) {
                tracing::info!("Sweep of {} aborted by user", plan.region);
                return SweepOutcome::Aborted;
            }
        }

        let mut result = OperationResult::new();
        for kind_plan in plan.kinds {
            let kind_result = match kind_plan.targets {
                Ok(targets) => self.handle_kind(targets, dry_run).await,
                Err(message) => {
                    let mut r = OperationResult::new();
                    r.record(
                        ResourceDescriptor::whole_kind(kind_plan.kind, plan.region.clone()),
                        Outcome::Error(message),
                    );
                    r
                }
            };
            result = result.merge(kind_result);
        }

        SweepOutcome::Completed(result)
    }

    /// Emergency stop of everything billable in `scope`
    pub async fn sweep(&self, region: &str, scope: SweepScope, dry_run: bool) -> SweepOutcome {
        tracing::info!("Sweeping {} (scope {}, dry_run={})", region, scope, dry_run);
        let plan = self.plan_sweep(region, scope).await;
        self.execute(plan, dry_run).await
    }

    /// Delete endpoints, then endpoint configs, then models named `prefix*`
    pub async fn cleanup(&self, region: &str, prefix: &str, dry_run: bool) -> Result<SweepOutcome> {
        tracing::info!("Cleaning up {}* in {} (dry_run={})", prefix, region, dry_run);
        let plan = self.plan_cleanup(region, prefix).await?;
        Ok(self.execute(plan, dry_run).await)
    }

    async fn handle_kind(&self, targets: Vec<(ResourceSummary, SweepAction)>, dry_run: bool) -> OperationResult {
        let mut result = OperationResult::new();

        for (summary, action) in targets {
            let descriptor = summary.descriptor.clone();

            if dry_run {
                tracing::info!("[DRY RUN] Would {} {}", action.verb(), descriptor);
                let outcome = match action {
                    SweepAction::Delete => Outcome::WouldDelete,
                    SweepAction::Stop => Outcome::WouldStop,
                };
                result.record(descriptor, outcome);
                continue;
            }

            let (call, done) = match action {
                SweepAction::Delete => (self.plane.delete(&summary).await, Outcome::Deleted),
                SweepAction::Stop => (self.plane.stop(&summary).await, Outcome::Stopped),
            };

            match call {
                Ok(()) => {
                    tracing::info!("{} {}", descriptor, done);
                    result.record(descriptor, done);
                }
                Err(e) if e.is_not_found() => {
                    tracing::info!("{} disappeared before it could be {}", descriptor, done);
                    result.record(descriptor, Outcome::AlreadyGone);
                }
                Err(e) => {
                    tracing::warn!("Failed to {} {}: {}", action.verb(), descriptor, e);
                    result.record(descriptor, Outcome::Error(format_aws_error(&e)));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, MockControlPlane, TEST_REGION};
    use std::cell::Cell;
    use ResourceState::*;

    fn yes(_: &str) -> bool {
        true
    }

    fn completed(outcome: SweepOutcome) -> OperationResult {
        match outcome {
            SweepOutcome::Completed(r) => r,
            SweepOutcome::Aborted => panic!("sweep aborted"),
        }
    }

    #[test]
    fn test_scope_kinds_follow_priority() {
        assert_eq!(SweepScope::Endpoints.kinds(), vec![ResourceKind::Endpoint]);
        let managed = SweepScope::Managed.kinds();
        assert_eq!(managed.first(), Some(&ResourceKind::Endpoint));
        assert_eq!(managed.last(), Some(&ResourceKind::NotebookInstance));
        assert_eq!(SweepScope::Full.kinds().len(), 9);
        assert_eq!(SweepScope::Full.kinds().last(), Some(&ResourceKind::CodeInterpreterSession));
    }

    #[tokio::test]
    async fn test_empty_account_makes_no_mutating_calls() {
        let plane = MockControlPlane::new();
        let asked = Cell::new(false);
        let confirm = |_: &str| {
            asked.set(true);
            true
        };

        let r = completed(Decommissioner::new(&plane, &confirm).sweep(TEST_REGION, SweepScope::Full, false).await);
        assert_eq!((r.deleted, r.stopped, r.errors), (0, 0, 0));
        assert!(plane.mutating_calls().is_empty());
        assert!(!asked.get());
    }

    #[tokio::test]
    async fn test_endpoints_swept_before_jobs() {
        let plane = MockControlPlane::new();
        let job = plane.add(ResourceKind::TrainingJob, "databy-train", Running);
        let endpoint = plane.add(ResourceKind::Endpoint, "databy-a", Ready);

        let r = completed(Decommissioner::new(&plane, &yes).sweep(TEST_REGION, SweepScope::Managed, false).await);
        assert_eq!(plane.mutating_calls(), vec![Call::Delete(endpoint), Call::Stop(job)]);
        assert_eq!((r.deleted, r.stopped), (1, 1));
    }

    #[tokio::test]
    async fn test_non_billable_states_are_skipped() {
        let plane = MockControlPlane::new();
        plane.add(ResourceKind::Endpoint, "databy-deleting", Deleting);
        plane.add(ResourceKind::TrainingJob, "databy-done", Stopped);
        plane.add(ResourceKind::NotebookInstance, "databy-nb", Stopped);

        let r = completed(Decommissioner::new(&plane, &yes).sweep(TEST_REGION, SweepScope::Managed, false).await);
        assert!(r.is_empty());
        assert!(plane.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_list_failure_recorded_and_sweep_continues() {
        let plane = MockControlPlane::new();
        plane.fail_list(ResourceKind::Endpoint, "AccessDenied");
        let job = plane.add(ResourceKind::TrainingJob, "databy-train", Running);

        let r = completed(Decommissioner::new(&plane, &yes).sweep(TEST_REGION, SweepScope::Managed, false).await);
        assert_eq!(r.errors, 1);
        assert_eq!(r.details[0].0.kind, ResourceKind::Endpoint);
        assert_eq!(r.stopped, 1);
        assert_eq!(plane.mutating_calls(), vec![Call::Stop(job)]);
    }

    #[tokio::test]
    async fn test_vanished_resource_is_not_an_error() {
        let plane = MockControlPlane::new();
        let gone = plane.add(ResourceKind::Endpoint, "databy-a", Ready);
        let kept = plane.add(ResourceKind::Endpoint, "databy-b", Ready);
        plane.fail_action_not_found(ResourceKind::Endpoint, "databy-a");

        let r = completed(Decommissioner::new(&plane, &yes).sweep(TEST_REGION, SweepScope::Endpoints, false).await);
        assert_eq!((r.deleted, r.errors), (1, 0));
        assert!(!r.has_errors());
        assert_eq!(r.details, vec![(gone, Outcome::AlreadyGone), (kept, Outcome::Deleted)]);
    }

    #[tokio::test]
    async fn test_decline_aborts_before_any_mutation() {
        let plane = MockControlPlane::new();
        plane.add(ResourceKind::Endpoint, "databy-a", Ready);
        let no = |_: &str| false;

        let outcome = Decommissioner::new(&plane, &no).sweep(TEST_REGION, SweepScope::Endpoints, false).await;
        assert!(matches!(outcome, SweepOutcome::Aborted));
        assert!(plane.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_never_asks_and_never_mutates() {
        let plane = MockControlPlane::new();
        plane.add(ResourceKind::Endpoint, "databy-a", Ready);
        plane.add(ResourceKind::NotebookInstance, "databy-nb", Ready);
        let never = |_: &str| -> bool { panic!("dry run must not prompt") };

        let r = completed(Decommissioner::new(&plane, &never).sweep(TEST_REGION, SweepScope::Full, true).await);
        assert!(plane.mutating_calls().is_empty());
        assert_eq!(r.details[0].1, Outcome::WouldDelete);
        assert_eq!(r.details[1].1, Outcome::WouldStop);
        assert_eq!((r.deleted, r.stopped), (0, 0));
    }

    #[tokio::test]
    async fn test_cleanup_deletes_endpoints_then_configs_then_models() {
        let plane = MockControlPlane::new();
        let model = plane.add(ResourceKind::Model, "databy-hf-model", Ready);
        let config = plane.add(ResourceKind::EndpointConfig, "databy-endpoint-config", Ready);
        let endpoint = plane.add(ResourceKind::Endpoint, "databy-endpoint", Ready);
        plane.add(ResourceKind::Model, "other-model", Ready);

        let outcome = Decommissioner::new(&plane, &yes).cleanup(TEST_REGION, "databy", false).await.unwrap();
        let r = completed(outcome);
        assert_eq!(r.deleted, 3);
        assert_eq!(
            plane.mutating_calls(),
            vec![Call::Delete(endpoint), Call::Delete(config), Call::Delete(model)]
        );
        assert_eq!(plane.state_of(ResourceKind::Model, "other-model"), Some(Ready));
    }

    #[tokio::test]
    async fn test_cleanup_rejects_empty_prefix() {
        let plane = MockControlPlane::new();
        let err = Decommissioner::new(&plane, &yes).cleanup(TEST_REGION, " ", false).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Precondition(_)));
        assert!(plane.calls().is_empty());
    }
}
