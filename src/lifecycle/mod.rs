//! Resource lifecycle management
//!
//! - [`locator`] - find resources by kind and name pattern
//! - [`provisioner`] - idempotent `ensure` and agent preparation
//! - [`decommissioner`] - emergency stop and prefix cleanup
//! - [`poller`] - wait for a resource to reach a terminal state
//!
//! All of them talk to the provider through [`ControlPlane`].

mod confirm;
pub mod decommissioner;
mod error;
pub mod locator;
mod plane;
pub mod poller;
pub mod provisioner;
mod report;
pub mod spec;

pub use confirm::{AssumeYes, Confirm, StdinConfirm};
pub use decommissioner::{Decommissioner, SweepOutcome, SweepPlan, SweepScope};
pub use error::{LifecycleError, Result};
pub use plane::ControlPlane;
pub use poller::{wait_until, PollConfig, PollOutcome};
pub use provisioner::{EnsureAction, EnsureOutcome, Provisioner};
pub use report::{OperationResult, Outcome};
pub use spec::ProvisionSpec;
