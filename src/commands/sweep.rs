//! stop-all and cleanup: enumerate, print, confirm, act, report

use super::Status;
use crate::lifecycle::decommissioner::SweepPlan;
use crate::lifecycle::{Confirm, ControlPlane, Decommissioner, SweepOutcome, SweepScope};
use colored::Colorize;

/// Print what a sweep found, kind by kind
pub fn print_plan(plan: &SweepPlan) {
    println!("{}", format!("Resources found in {}:", plan.region).bold());

    for kind_plan in &plan.kinds {
        match &kind_plan.targets {
            Err(message) => {
                println!(
                    "  {} {}",
                    kind_plan.kind.to_string().cyan(),
                    format!("list failed: {}", message).red()
                )
            }
            Ok(targets) if targets.is_empty() => {
                println!("  {} {}", kind_plan.kind.to_string().cyan(), "none".dimmed())
            }
            Ok(targets) => {
                println!("  {} ({})", kind_plan.kind.to_string().cyan(), targets.len());
                for (summary, action) in targets {
                    println!(
                        "    - {} [{}] -> {}",
                        summary.descriptor.name,
                        summary.status,
                        action.verb()
                    );
                }
            }
        }
    }
    println!();
}

/// Render a finished sweep and turn it into an exit code
pub fn report(outcome: SweepOutcome, dry_run: bool) -> Status {
    match outcome {
        SweepOutcome::Aborted => {
            println!("{}", "aborted by user".yellow());
            Status::Success
        }
        SweepOutcome::Completed(result) => {
            if dry_run {
                println!("{}", "[DRY RUN] No resources were modified.".yellow().bold());
            }
            result.print();
            Status::from_success(!result.has_errors())
        }
    }
}

/// Emergency stop of every billable resource in `scope`
pub async fn stop_all(
    plane: &dyn ControlPlane,
    confirm: &dyn Confirm,
    region: &str,
    scope: SweepScope,
    dry_run: bool,
) -> anyhow::Result<Status> {
    println!(
        "{}",
        format!("Emergency stop in {} (scope: {})", region, scope).yellow().bold()
    );

    let decommissioner = Decommissioner::new(plane, confirm);
    let plan = decommissioner.plan_sweep(region, scope).await;
    print_plan(&plan);

    let outcome = decommissioner.execute(plan, dry_run).await;
    Ok(report(outcome, dry_run))
}

/// Delete endpoints, endpoint configs and models named `prefix*`
pub async fn cleanup(
    plane: &dyn ControlPlane,
    confirm: &dyn Confirm,
    region: &str,
    prefix: &str,
    dry_run: bool,
) -> anyhow::Result<Status> {
    println!(
        "{}",
        format!("Cleaning up resources named {}* in {}", prefix, region).yellow().bold()
    );

    let decommissioner = Decommissioner::new(plane, confirm);
    let plan = decommissioner.plan_cleanup(region, prefix).await?;
    print_plan(&plan);

    let outcome = decommissioner.execute(plan, dry_run).await;
    Ok(report(outcome, dry_run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::AssumeYes;
    use crate::resource::{ResourceKind, ResourceState};
    use crate::testing::{MockControlPlane, TEST_REGION};

    #[tokio::test]
    async fn test_failed_sweep_exits_non_zero() {
        let plane = MockControlPlane::new();
        plane.add(ResourceKind::Endpoint, "databy-a", ResourceState::Ready);
        plane.fail_action(ResourceKind::Endpoint, "databy-a", "AccessDenied");

        let code = stop_all(&plane, &AssumeYes, TEST_REGION, SweepScope::Endpoints, false)
            .await
            .unwrap();
        assert_eq!(code, Status::Failure);
    }

    #[tokio::test]
    async fn test_declined_sweep_exits_zero() {
        let plane = MockControlPlane::new();
        plane.add(ResourceKind::Endpoint, "databy-a", ResourceState::Ready);
        let decline = |_: &str| false;

        let code = stop_all(&plane, &decline, TEST_REGION, SweepScope::Full, false)
            .await
            .unwrap();
        assert_eq!(code, Status::Success);
        assert!(plane.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_cleanup_prefix_is_rejected() {
        let plane = MockControlPlane::new();
        assert!(cleanup(&plane, &AssumeYes, TEST_REGION, "", true).await.is_err());
    }
}
