use super::{print_timeout, Status};
use crate::lifecycle::{wait_until, ControlPlane, PollConfig, PollOutcome};
use crate::resource::ResourceDescriptor;
use colored::Colorize;

/// Poll a resource until its kind's ready state
pub async fn handle(
    plane: &dyn ControlPlane,
    descriptor: &ResourceDescriptor,
    poll: PollConfig,
) -> anyhow::Result<Status> {
    println!(
        "{}",
        format!(
            "Waiting for {} (every {}s, at most {} attempts, up to {}s)...",
            descriptor,
            poll.interval.as_secs(),
            poll.max_attempts,
            poll.budget().as_secs()
        )
        .yellow()
    );

    let wait = wait_until(plane, descriptor, &descriptor.kind.ready_states(), poll).await?;
    match &wait {
        PollOutcome::Reached { state, attempts } => {
            println!(
                "{}",
                format!("✓ {} is {} after {} attempt(s)", descriptor, state, attempts)
                    .green()
                    .bold()
            );
            Ok(Status::Success)
        }
        PollOutcome::Failed { status, .. } => {
            println!(
                "{}",
                format!("✗ {} failed after {} attempt(s): {}", descriptor, wait.attempts(), status)
                    .red()
                    .bold()
            );
            Ok(Status::Failure)
        }
        PollOutcome::TimedOut { .. } => {
            print_timeout(descriptor, &wait);
            Ok(Status::Success)
        }
    }
}
