//! Property-based tests of the emergency stop against the scripted control plane

use databy_cloud::lifecycle::{AssumeYes, Decommissioner, OperationResult, SweepOutcome, SweepScope};
use databy_cloud::resource::{get_resource, ResourceKind, ResourceState};
use databy_cloud::testing::{MockControlPlane, TEST_REGION};
use proptest::prelude::*;

const KINDS: [ResourceKind; 4] = [
    ResourceKind::Endpoint,
    ResourceKind::TrainingJob,
    ResourceKind::NotebookInstance,
    ResourceKind::ProvisionedThroughput,
];

const STATES: [ResourceState; 8] = [
    ResourceState::Creating,
    ResourceState::Updating,
    ResourceState::Ready,
    ResourceState::Running,
    ResourceState::Failed,
    ResourceState::Stopped,
    ResourceState::Deleting,
    ResourceState::Unknown,
];

/// (kind, state, fails) per resource
fn arb_fleet() -> impl Strategy<Value = Vec<(ResourceKind, ResourceState, bool)>> {
    prop::collection::vec(
        (
            prop::sample::select(KINDS.to_vec()),
            prop::sample::select(STATES.to_vec()),
            any::<bool>(),
        ),
        0..20,
    )
}

fn seed(fleet: &[(ResourceKind, ResourceState, bool)], with_failures: bool) -> (MockControlPlane, usize, usize) {
    let plane = MockControlPlane::new();
    let mut billable = 0;
    let mut failing = 0;

    for (i, (kind, state, fails)) in fleet.iter().enumerate() {
        let name = format!("databy-{}", i);
        plane.add(*kind, &name, *state);
        if get_resource(*kind).unwrap().is_billable(*state) {
            billable += 1;
            if with_failures && *fails {
                failing += 1;
            }
        }
        if with_failures && *fails {
            plane.fail_action(*kind, &name, "InternalFailure");
        }
    }

    (plane, billable, failing)
}

fn completed(outcome: SweepOutcome) -> OperationResult {
    match outcome {
        SweepOutcome::Completed(result) => result,
        SweepOutcome::Aborted => panic!("sweep aborted"),
    }
}

proptest! {
    #[test]
    fn dry_run_never_mutates(fleet in arb_fleet()) {
        let (plane, billable, _) = seed(&fleet, false);
        let decommissioner = Decommissioner::new(&plane, &AssumeYes);

        let result = completed(tokio_test::block_on(
            decommissioner.sweep(TEST_REGION, SweepScope::Full, true),
        ));

        prop_assert!(plane.mutating_calls().is_empty());
        prop_assert_eq!(result.would_act(), billable);
        prop_assert_eq!(result.deleted + result.stopped + result.errors, 0);
    }

    #[test]
    fn one_failure_does_not_stop_the_sweep(fleet in arb_fleet()) {
        let (plane, billable, failing) = seed(&fleet, true);
        let decommissioner = Decommissioner::new(&plane, &AssumeYes);

        let result = completed(tokio_test::block_on(
            decommissioner.sweep(TEST_REGION, SweepScope::Full, false),
        ));

        prop_assert_eq!(result.errors, failing);
        prop_assert_eq!(result.deleted + result.stopped + result.errors, billable);
        prop_assert_eq!(result.details.len(), billable);
        prop_assert_eq!(plane.mutating_calls().len(), billable);
    }

    #[test]
    fn declined_confirmation_never_mutates(fleet in arb_fleet()) {
        let (plane, _, _) = seed(&fleet, false);
        let decline = |_: &str| false;
        let decommissioner = Decommissioner::new(&plane, &decline);

        let outcome = tokio_test::block_on(decommissioner.sweep(TEST_REGION, SweepScope::Full, false));

        prop_assert!(plane.mutating_calls().is_empty());
        if let SweepOutcome::Completed(result) = outcome {
            prop_assert!(result.is_empty());
        }
    }
}
