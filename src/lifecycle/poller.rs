//! Status Poller
//!
//! Repeatedly describes a resource until it reaches one of a set of
//! terminal states or the attempt budget runs out.

use super::plane::ControlPlane;
use crate::aws::error::Result;
use crate::resource::{Lifecycle, ResourceDescriptor, ResourceState, TerminalStates};
use std::time::Duration;

/// Default delay between describes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default number of describes before giving up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Total time the poller may sleep
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Reached {
        state: ResourceState,
        attempts: u32,
    },
    /// Provider reported a failure state
    Failed {
        state: ResourceState,
        status: String,
        attempts: u32,
    },
    TimedOut {
        last: ResourceState,
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, PollOutcome::Reached { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Reached { attempts, .. }
            | PollOutcome::Failed { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Describe `descriptor` until its state is in `terminal`.
///
/// At most `config.max_attempts` describes are made, with
/// `config.interval` between consecutive ones. A missing resource is
/// observed as [`ResourceState::Absent`]. Describe errors are returned
/// as-is.
pub async fn wait_until(
    plane: &dyn ControlPlane,
    descriptor: &ResourceDescriptor,
    terminal: &TerminalStates,
    config: PollConfig,
) -> Result<PollOutcome> {
    let lifecycle = Lifecycle::of(descriptor.kind);
    let max_attempts = config.max_attempts.max(1);
    let mut previous: Option<ResourceState> = None;

    for attempt in 1..=max_attempts {
        let (state, status) = match plane.describe(descriptor).await? {
            Some(summary) => (summary.state, summary.status),
            None => (ResourceState::Absent, "absent".to_string()),
        };

        match previous {
            Some(prev) if !lifecycle.permits(prev, state) => {
                tracing::warn!("{}: unexpected transition {} -> {}", descriptor, prev, state);
            }
            Some(prev) if prev != state => {
                tracing::info!("{}: {} -> {}", descriptor, prev, state);
            }
            _ => {}
        }
        previous = Some(state);

        if terminal.is_success(state) {
            tracing::debug!("{} reached {} after {} attempt(s)", descriptor, state, attempt);
            return Ok(PollOutcome::Reached {
                state,
                attempts: attempt,
            });
        }

        if terminal.is_failure(state) {
            tracing::warn!("{} failed with status {}", descriptor, status);
            return Ok(PollOutcome::Failed {
                state,
                status,
                attempts: attempt,
            });
        }

        if attempt < max_attempts {
            tracing::debug!(
                "{} is {}, retrying in {:?} ({}/{})",
                descriptor,
                state,
                config.interval,
                attempt,
                max_attempts
            );
            tokio::time::sleep(config.interval).await;
        }
    }

    let last = previous.unwrap_or(ResourceState::Unknown);
    tracing::warn!("Timed out waiting for {} (last state {})", descriptor, last);
    Ok(PollOutcome::TimedOut {
        last,
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use crate::testing::{Call, MockControlPlane};
    use ResourceState::*;

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig::new(max_attempts, Duration::ZERO)
    }

    fn describes(plane: &MockControlPlane) -> usize {
        plane
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Describe(_)))
            .count()
    }

    #[tokio::test]
    async fn test_reaches_ready_after_creating() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Endpoint, "databy-endpoint", Creating);
        plane.script(&d, &[Creating, Creating, Ready]);

        let outcome = wait_until(&plane, &d, &ResourceKind::Endpoint.ready_states(), fast(10))
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::Reached { state: Ready, attempts: 3 });
        assert_eq!(describes(&plane), 3);
    }

    #[tokio::test]
    async fn test_failure_state_stops_immediately() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Endpoint, "databy-endpoint", Creating);
        plane.script(&d, &[Creating, Failed, Ready]);

        let outcome = wait_until(&plane, &d, &ResourceKind::Endpoint.ready_states(), fast(10))
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::Failed { state: Failed, attempts: 2, .. }));
        assert_eq!(describes(&plane), 2);
    }

    #[tokio::test]
    async fn test_timeout_after_exactly_max_attempts() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Domain, "databy-ai-domain", Creating);

        let outcome = wait_until(&plane, &d, &ResourceKind::Domain.ready_states(), fast(4))
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { last: Creating, attempts: 4 });
        assert_eq!(describes(&plane), 4);
    }

    #[tokio::test]
    async fn test_missing_resource_counts_as_absent() {
        let plane = MockControlPlane::new();
        let d = ResourceDescriptor::new(ResourceKind::Endpoint, "gone", "us-east-1");

        let outcome = wait_until(&plane, &d, &TerminalStates::gone(), fast(3)).await.unwrap();
        assert_eq!(outcome, PollOutcome::Reached { state: Absent, attempts: 1 });
    }

    #[tokio::test]
    async fn test_describe_error_propagates() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Endpoint, "databy-endpoint", Creating);
        plane.fail_describe("Rate exceeded");

        assert!(wait_until(&plane, &d, &TerminalStates::gone(), fast(3)).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleeps_only_between_attempts() {
        let plane = MockControlPlane::new();
        let d = plane.add(ResourceKind::Endpoint, "databy-endpoint", Creating);
        let config = PollConfig::new(3, Duration::from_secs(30));

        let started = tokio::time::Instant::now();
        let outcome = wait_until(&plane, &d, &ResourceKind::Endpoint.ready_states(), config)
            .await
            .unwrap();
        assert!(matches!(outcome, PollOutcome::TimedOut { attempts: 3, .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= config.budget());
        assert!(elapsed < config.budget() + Duration::from_secs(1));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(PollConfig::new(0, Duration::ZERO).max_attempts, 1);
    }
}
